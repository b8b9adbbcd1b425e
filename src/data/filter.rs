//! Reusable surface predicates and component formatters.
//!
//! `transform` and `file_write` take plain closures (`Fn(&Surface) -> bool`
//! for inclusion, `Fn(&Surface) -> Vec<StateSubset>` for formatting); these
//! helpers cover the common cases so call sites stay short.

use super::model::{StateSubset, Surface};

/// Include every surface. The default include/transform predicate.
pub fn include_all(_: &Surface) -> bool {
    true
}

/// Emit all six pose components. The default format function.
pub fn all_components(_: &Surface) -> Vec<StateSubset> {
    StateSubset::ALL.to_vec()
}

/// Include only the surface with the given name.
pub fn named(name: &str) -> impl Fn(&Surface) -> bool + '_ {
    move |surface| surface.name.as_deref() == Some(name)
}

/// Include surfaces whose name appears in the given list. Unnamed surfaces
/// never match.
pub fn named_any<'a>(names: &'a [&'a str]) -> impl Fn(&Surface) -> bool + 'a {
    move |surface| {
        surface
            .name
            .as_deref()
            .is_some_and(|name| names.contains(&name))
    }
}

/// Emit a fixed component subset for every surface.
pub fn components(subset: Vec<StateSubset>) -> impl Fn(&Surface) -> Vec<StateSubset> {
    move |_| subset.clone()
}
