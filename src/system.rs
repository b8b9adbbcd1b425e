//! Optical configurations and multi-configuration systems.
//!
//! An [`OpticalConfiguration`] owns one ordered surface list (beam-path
//! order, as exported) and exposes the transform / filter / write
//! operations over it. A [`MultiConfigSystem`] fans the same operations out
//! across several configurations, e.g. one per optical path or wavelength.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::filter;
use crate::data::loader;
use crate::data::model::{PrescriptionError, StateSubset, Surface};
use crate::transform::RigidTransform;

/// Configuration number assigned when none is given.
pub const DEFAULT_CONFIG_NUMBER: i32 = 1;

// ---------------------------------------------------------------------------
// SurfaceRef – how callers may point at a surface
// ---------------------------------------------------------------------------

/// A reference to a surface within a configuration: by name, by position in
/// the surface list, or by the surface itself.
#[derive(Debug, Clone, Copy)]
pub enum SurfaceRef<'a> {
    Name(&'a str),
    Index(usize),
    Surface(&'a Surface),
}

impl<'a> From<&'a str> for SurfaceRef<'a> {
    fn from(name: &'a str) -> Self {
        SurfaceRef::Name(name)
    }
}

impl From<usize> for SurfaceRef<'_> {
    fn from(index: usize) -> Self {
        SurfaceRef::Index(index)
    }
}

impl<'a> From<&'a Surface> for SurfaceRef<'a> {
    fn from(surface: &'a Surface) -> Self {
        SurfaceRef::Surface(surface)
    }
}

// ---------------------------------------------------------------------------
// OpticalConfiguration
// ---------------------------------------------------------------------------

/// One complete ordered set of surfaces for a single optical configuration.
///
/// Surface order is the export order (the physical beam path) and is
/// preserved by every operation here; filters select, they never reorder or
/// remove.
#[derive(Debug, Clone)]
pub struct OpticalConfiguration {
    pub surfaces: Vec<Surface>,
    pub config_number: i32,
}

impl OpticalConfiguration {
    /// Wrap a surface list under [`DEFAULT_CONFIG_NUMBER`].
    pub fn new(surfaces: Vec<Surface>) -> Self {
        Self {
            surfaces,
            config_number: DEFAULT_CONFIG_NUMBER,
        }
    }

    /// Set the configuration number (builder style).
    pub fn with_config_number(mut self, config_number: i32) -> Self {
        self.config_number = config_number;
        self
    }

    // ---- loading / saving ----

    /// Load a configuration from a prescription export file.
    pub fn load_from_prescription_text(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(loader::read_prescription_file(path.as_ref())?))
    }

    /// Load a configuration from a CSV file written by [`Self::write_to_csv`].
    pub fn load_from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(loader::load_csv(path.as_ref())?))
    }

    /// Write all surfaces to a CSV file, one record per surface, in order.
    pub fn write_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        loader::write_csv(path.as_ref(), &self.surfaces)
    }

    // ---- transform / write ----

    /// Apply a rigid-body transform to every surface the predicate accepts;
    /// surfaces it rejects are left untouched.
    pub fn transform<F>(&mut self, t: &RigidTransform, filter_fn: F)
    where
        F: Fn(&Surface) -> bool,
    {
        for surface in self.surfaces.iter_mut().filter(|s| filter_fn(s)) {
            surface.transform(t);
        }
    }

    /// Apply a rigid-body transform to every surface.
    pub fn transform_all(&mut self, t: &RigidTransform) {
        self.transform(t, filter::include_all);
    }

    /// Write CAD variable lines for every surface passing `include_filter`,
    /// emitting the components `format_filter_fn` selects for it, in order.
    /// With `use_config_number` the keys carry a `_<config_number>` suffix.
    ///
    /// An I/O failure aborts the iteration; lines already written stay in
    /// the stream, so callers must treat partial output as invalid.
    pub fn file_write<W, F, G>(
        &self,
        out: &mut W,
        include_filter: F,
        format_filter_fn: G,
        use_config_number: bool,
    ) -> Result<()>
    where
        W: Write,
        F: Fn(&Surface) -> bool,
        G: Fn(&Surface) -> Vec<StateSubset>,
    {
        let config = use_config_number.then_some(self.config_number);

        for surface in self.surfaces.iter().filter(|s| include_filter(s)) {
            let subset = format_filter_fn(surface);
            out.write_all(surface.to_cad_string(&subset, config).as_bytes())
                .with_context(|| format!("writing CAD lines for surface {}", surface.index))?;
        }
        Ok(())
    }

    /// Default write: every surface, all six components, config suffix on.
    pub fn write_all<W: Write>(&self, out: &mut W) -> Result<()> {
        self.file_write(out, filter::include_all, filter::all_components, true)
    }

    // ---- queries ----

    /// Position of the first surface with the given name, if any.
    pub fn get_surface_index(&self, name: &str) -> Option<usize> {
        self.surfaces
            .iter()
            .position(|surface| surface.name.as_deref() == Some(name))
    }

    fn resolve(&self, reference: SurfaceRef<'_>) -> Result<usize, PrescriptionError> {
        match reference {
            SurfaceRef::Name(name) => self
                .get_surface_index(name)
                .ok_or_else(|| PrescriptionError::UnknownSurface(name.to_string())),
            SurfaceRef::Index(index) => {
                if index < self.surfaces.len() {
                    Ok(index)
                } else {
                    Err(PrescriptionError::IndexOutOfRange {
                        index,
                        len: self.surfaces.len(),
                    })
                }
            }
            SurfaceRef::Surface(surface) => self
                .surfaces
                .iter()
                .position(|s| std::ptr::eq(s, surface))
                .or_else(|| {
                    surface
                        .name
                        .as_deref()
                        .and_then(|name| self.get_surface_index(name))
                })
                .ok_or_else(|| {
                    PrescriptionError::UnknownSurface(surface.cad_identifier().to_string())
                }),
        }
    }

    /// Path length along the beam from `from` to `to`: the sum of Euclidean
    /// distances between each pair of physically adjacent surfaces, not the
    /// straight-line chord.
    ///
    /// `from` is expected to precede `to` in the surface list; when it does
    /// not, the walk is empty and the result is 0.0.
    pub fn distance_between_surfaces<'a>(
        &'a self,
        from: impl Into<SurfaceRef<'a>>,
        to: impl Into<SurfaceRef<'a>>,
    ) -> Result<f64, PrescriptionError> {
        let start = self.resolve(from.into())?;
        let end = self.resolve(to.into())?;

        let mut distance = 0.0;
        for i in start..end {
            distance += (self.surfaces[i + 1].coords - self.surfaces[i].coords).norm();
        }
        Ok(distance)
    }

    /// Vector from a surface to the next one along the beam path.
    pub fn beam_vector<'a>(
        &'a self,
        at: impl Into<SurfaceRef<'a>>,
    ) -> Result<nalgebra::Vector3<f64>, PrescriptionError> {
        let index = self.resolve(at.into())?;
        let next = self
            .surfaces
            .get(index + 1)
            .ok_or(PrescriptionError::IndexOutOfRange {
                index: index + 1,
                len: self.surfaces.len(),
            })?;
        Ok(next.coords - self.surfaces[index].coords)
    }
}

// ---------------------------------------------------------------------------
// MultiConfigSystem
// ---------------------------------------------------------------------------

/// An ordered collection of configurations sharing the same operations.
#[derive(Debug, Clone)]
pub struct MultiConfigSystem {
    pub configs: Vec<OpticalConfiguration>,
}

impl MultiConfigSystem {
    pub fn new(configs: Vec<OpticalConfiguration>) -> Self {
        Self { configs }
    }

    /// Parse each file into one configuration. Configurations are numbered
    /// `1..N` by position unless `config_numbers` supplies explicit numbers,
    /// whose length must match `files`.
    pub fn load_from_multiple_configs(
        files: &[impl AsRef<Path>],
        config_numbers: Option<&[i32]>,
    ) -> Result<Self> {
        if let Some(numbers) = config_numbers {
            if numbers.len() != files.len() {
                return Err(PrescriptionError::ConfigNumberMismatch {
                    files: files.len(),
                    numbers: numbers.len(),
                }
                .into());
            }
        }

        let mut configs = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            let number = config_numbers.map_or(i as i32 + 1, |numbers| numbers[i]);
            configs.push(
                OpticalConfiguration::load_from_prescription_text(file)?
                    .with_config_number(number),
            );
        }
        Ok(Self::new(configs))
    }

    /// Load each CSV file as one configuration, numbered `1..N` by position.
    pub fn load_from_multiple_csvs(files: &[impl AsRef<Path>]) -> Result<Self> {
        let mut configs = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            configs.push(
                OpticalConfiguration::load_from_csv(file)?.with_config_number(i as i32 + 1),
            );
        }
        Ok(Self::new(configs))
    }

    /// Apply a transform to every configuration, reusing the same predicate.
    pub fn transform<F>(&mut self, t: &RigidTransform, filter_fn: F)
    where
        F: Fn(&Surface) -> bool,
    {
        for config in &mut self.configs {
            config.transform(t, &filter_fn);
        }
    }

    /// Write every configuration's CAD lines to the stream in list order,
    /// reusing the same filter and format callables. Keys carry each
    /// configuration's number as a suffix.
    pub fn file_write<W, F, G>(
        &self,
        out: &mut W,
        include_filter: F,
        format_filter_fn: G,
    ) -> Result<()>
    where
        W: Write,
        F: Fn(&Surface) -> bool,
        G: Fn(&Surface) -> Vec<StateSubset>,
    {
        for config in &self.configs {
            config.file_write(out, &include_filter, &format_filter_fn, true)?;
        }
        Ok(())
    }

    /// Default write: every surface of every configuration, all components.
    pub fn write_all<W: Write>(&self, out: &mut W) -> Result<()> {
        self.file_write(out, filter::include_all, filter::all_components)
    }
}
