use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::{rotation_from_tilt_deg, tilt_deg_from_rotation, RigidTransform};

// ---------------------------------------------------------------------------
// PrescriptionError – every way the pipeline can fail
// ---------------------------------------------------------------------------

/// Errors raised while parsing prescription data or producing CAD output.
#[derive(Debug, Error)]
pub enum PrescriptionError {
    /// The literal banner preceding the coordinate table never appeared.
    #[error("prescription table marker not found in input")]
    MissingTableMarker,
    /// A first data row had fewer columns than the fixed layout requires.
    #[error("malformed prescription row, expected at least 6 columns: {tokens:?}")]
    MalformedRow { tokens: Vec<String> },
    /// The input ended inside a 3-row surface record.
    #[error("surface record starting at table line {line} is truncated (expected 3 data rows)")]
    TruncatedRecord { line: usize },
    /// A coordinate or tilt column did not parse as a number.
    #[error("invalid number {token:?} in prescription data")]
    BadNumber { token: String },
    /// A CSV record was outside the accepted 7/8-field layout.
    #[error("CSV record has {count} fields, expected 7 or 8: {line:?}")]
    CsvFieldCount { count: usize, line: String },
    /// A state component tag was not one of the six recognized names.
    #[error("unrecognized state component {0:?}")]
    UnknownComponent(String),
    /// A surface lookup by name found nothing.
    #[error("no surface named {0:?}")]
    UnknownSurface(String),
    /// A positional surface reference was out of range.
    #[error("surface index {index} out of range for {len} surfaces")]
    IndexOutOfRange { index: usize, len: usize },
    /// Explicit configuration numbers did not line up with the input files.
    #[error("{files} input files but {numbers} configuration numbers")]
    ConfigNumberMismatch { files: usize, numbers: usize },
}

pub(crate) fn parse_float(token: &str) -> Result<f64, PrescriptionError> {
    token
        .trim()
        .parse()
        .map_err(|_| PrescriptionError::BadNumber {
            token: token.to_string(),
        })
}

// ---------------------------------------------------------------------------
// StateSubset – the six scalar pose components
// ---------------------------------------------------------------------------

/// One scalar component of a surface pose.
///
/// The canonical names (`X` … `TILT_Z`) are what appears in CAD output keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateSubset {
    X,
    Y,
    Z,
    TiltX,
    TiltY,
    TiltZ,
}

impl StateSubset {
    /// The linear coordinates.
    pub const LINEAR: [StateSubset; 3] = [StateSubset::X, StateSubset::Y, StateSubset::Z];

    /// The angular coordinates.
    pub const ANGULAR: [StateSubset; 3] =
        [StateSubset::TiltX, StateSubset::TiltY, StateSubset::TiltZ];

    /// All six components of the pose, linear first.
    pub const ALL: [StateSubset; 6] = [
        StateSubset::X,
        StateSubset::Y,
        StateSubset::Z,
        StateSubset::TiltX,
        StateSubset::TiltY,
        StateSubset::TiltZ,
    ];

    /// Canonical component name as used in CAD variable keys.
    pub fn name(self) -> &'static str {
        match self {
            StateSubset::X => "X",
            StateSubset::Y => "Y",
            StateSubset::Z => "Z",
            StateSubset::TiltX => "TILT_X",
            StateSubset::TiltY => "TILT_Y",
            StateSubset::TiltZ => "TILT_Z",
        }
    }
}

impl fmt::Display for StateSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateSubset {
    type Err = PrescriptionError;

    /// Parse a canonical component name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => Ok(StateSubset::X),
            "Y" => Ok(StateSubset::Y),
            "Z" => Ok(StateSubset::Z),
            "TILT_X" => Ok(StateSubset::TiltX),
            "TILT_Y" => Ok(StateSubset::TiltY),
            "TILT_Z" => Ok(StateSubset::TiltZ),
            _ => Err(PrescriptionError::UnknownComponent(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Surface – one optical element's pose and identity
// ---------------------------------------------------------------------------

/// A single optical surface: position, orientation, and identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Surface identifier as given by the export. Carried opaquely; not
    /// guaranteed unique or numeric.
    pub index: String,
    /// Position (x, y, z) in the export's linear unit (mm).
    pub coords: Vector3<f64>,
    /// Orientation as an axis-angle rotation vector in degrees.
    pub tilts: Vector3<f64>,
    /// Optional display name; `index` stands in when absent.
    pub name: Option<String>,
}

impl Surface {
    pub fn new(
        index: impl Into<String>,
        coords: Vector3<f64>,
        tilts: Vector3<f64>,
        name: Option<&str>,
    ) -> Self {
        Self {
            index: index.into(),
            coords,
            tilts,
            name: name.map(str::to_string),
        }
    }

    /// Apply a rigid-body transform to this surface's pose, in place.
    ///
    /// The position is rotated then translated. The orientation is
    /// recomposed through a matrix intermediate (`R · R_tilt`) rather than
    /// rotating the stored tilt components independently; the two are only
    /// equivalent for trivial rotations.
    pub fn transform(&mut self, t: &RigidTransform) {
        self.coords = t.rotation * self.coords + t.translation;

        let tilt_matrix = rotation_from_tilt_deg(&self.tilts);
        self.tilts = tilt_deg_from_rotation(&(t.rotation * tilt_matrix));
    }

    /// Read one scalar pose component.
    pub fn state_value(&self, subset: StateSubset) -> f64 {
        match subset {
            StateSubset::X => self.coords.x,
            StateSubset::Y => self.coords.y,
            StateSubset::Z => self.coords.z,
            StateSubset::TiltX => self.tilts.x,
            StateSubset::TiltY => self.tilts.y,
            StateSubset::TiltZ => self.tilts.z,
        }
    }

    /// The identifier used in CAD output keys: the name when present,
    /// otherwise the surface index.
    pub fn cad_identifier(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.index)
    }

    /// Render the requested pose components as CAD variable-assignment
    /// lines, one per component in request order, each newline-terminated:
    ///
    /// ```text
    /// "<identifier>_<COMPONENT>[_<config>]" = <value>
    /// ```
    ///
    /// The `_<config>` suffix is omitted entirely when `config` is `None`.
    /// Values are written in their shortest round-trip form; callers
    /// needing fixed precision format downstream.
    pub fn to_cad_string(&self, subset: &[StateSubset], config: Option<i32>) -> String {
        let suffix = match config {
            Some(number) => format!("_{number}"),
            None => String::new(),
        };

        let mut out = String::new();
        for component in subset {
            let _ = writeln!(
                out,
                "\"{}_{}{}\" = {}",
                self.cad_identifier(),
                component,
                suffix,
                self.state_value(*component)
            );
        }
        out
    }

    /// Serialize to one CSV record: `index,x,y,z,tilt_x,tilt_y,tilt_z[,name]`.
    /// The name field is present only when the surface has a name.
    pub fn to_csv_line(&self) -> String {
        self.csv_fields().join(",")
    }

    pub(crate) fn csv_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.index.clone(),
            self.coords.x.to_string(),
            self.coords.y.to_string(),
            self.coords.z.to_string(),
            self.tilts.x.to_string(),
            self.tilts.y.to_string(),
            self.tilts.z.to_string(),
        ];
        if let Some(name) = &self.name {
            fields.push(name.clone());
        }
        fields
    }

    /// Parse one CSV record as produced by [`Surface::to_csv_line`].
    /// Accepts 7 or 8 comma-separated fields; anything else is a format
    /// error.
    pub fn from_csv_line(line: &str) -> Result<Self, PrescriptionError> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        Self::from_csv_fields(&fields)
    }

    pub(crate) fn from_csv_fields(fields: &[&str]) -> Result<Self, PrescriptionError> {
        if fields.len() != 7 && fields.len() != 8 {
            return Err(PrescriptionError::CsvFieldCount {
                count: fields.len(),
                line: fields.join(","),
            });
        }

        let mut values = [0.0_f64; 6];
        for (slot, token) in values.iter_mut().zip(&fields[1..7]) {
            *slot = parse_float(token)?;
        }

        Ok(Surface {
            index: fields[0].trim().to_string(),
            coords: Vector3::new(values[0], values[1], values[2]),
            tilts: Vector3::new(values[3], values[4], values[5]),
            name: fields.get(7).map(|name| name.trim().to_string()),
        })
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Surf {}", self.index)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        write!(
            f,
            ": coords [{}, {}, {}], tilts [{}, {}, {}]",
            self.coords.x, self.coords.y, self.coords.z, self.tilts.x, self.tilts.y, self.tilts.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn sample_surface() -> Surface {
        Surface::new(
            "0",
            Vector3::new(0.1, 0.0, -0.4),
            Vector3::new(0.0, 45.0, 0.0),
            Some("text"),
        )
    }

    // ---- StateSubset ----

    #[test]
    fn subset_groups() {
        assert_eq!(StateSubset::ALL[..3], StateSubset::LINEAR);
        assert_eq!(StateSubset::ALL[3..], StateSubset::ANGULAR);
    }

    #[test]
    fn subset_parses_canonical_names() {
        assert_eq!("X".parse::<StateSubset>().unwrap(), StateSubset::X);
        assert_eq!("tilt_y".parse::<StateSubset>().unwrap(), StateSubset::TiltY);
    }

    #[test]
    fn subset_rejects_unknown_tag() {
        let err = "ROLL".parse::<StateSubset>().unwrap_err();
        assert!(matches!(err, PrescriptionError::UnknownComponent(tag) if tag == "ROLL"));
    }

    // ---- state access / CAD output ----

    #[test]
    fn state_value_maps_components() {
        let s = sample_surface();
        assert_eq!(s.state_value(StateSubset::X), 0.1);
        assert_eq!(s.state_value(StateSubset::Z), -0.4);
        assert_eq!(s.state_value(StateSubset::TiltY), 45.0);
    }

    #[test]
    fn cad_string_all_components() {
        let s = sample_surface();
        let out = s.to_cad_string(&StateSubset::ALL, None);
        let expected = "\"text_X\" = 0.1\n\
                        \"text_Y\" = 0\n\
                        \"text_Z\" = -0.4\n\
                        \"text_TILT_X\" = 0\n\
                        \"text_TILT_Y\" = 45\n\
                        \"text_TILT_Z\" = 0\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn cad_string_with_config_suffix() {
        let s = sample_surface();
        let out = s.to_cad_string(&[StateSubset::X], Some(2));
        assert_eq!(out, "\"text_X_2\" = 0.1\n");
    }

    #[test]
    fn cad_identifier_falls_back_to_index() {
        let s = Surface::new("7", Vector3::zeros(), Vector3::zeros(), None);
        assert_eq!(s.cad_identifier(), "7");
        assert_eq!(s.to_cad_string(&[StateSubset::Y], None), "\"7_Y\" = 0\n");
    }

    #[test]
    fn cad_string_omits_filtered_components() {
        let s = sample_surface();
        let out = s.to_cad_string(&[StateSubset::X, StateSubset::Y], None);
        assert!(out.contains("0.1"));
        assert!(out.contains("\"text_Y\" = 0"));
        assert!(!out.contains("-0.4"));
        assert!(!out.contains("TILT"));
    }

    #[test]
    fn cad_string_respects_request_order() {
        let s = sample_surface();
        let out = s.to_cad_string(&[StateSubset::TiltY, StateSubset::X], None);
        assert_eq!(out, "\"text_TILT_Y\" = 45\n\"text_X\" = 0.1\n");
    }

    // ---- CSV round trip ----

    #[test]
    fn csv_round_trip_with_name() {
        let s = sample_surface();
        let back = Surface::from_csv_line(&s.to_csv_line()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn csv_round_trip_without_name() {
        let s = Surface::new(
            "3",
            Vector3::new(1.25, -2.5, 1e-7),
            Vector3::new(0.0, 0.0, 179.5),
            None,
        );
        assert_eq!(s.to_csv_line(), "3,1.25,-2.5,0.0000001,0,0,179.5");
        let back = Surface::from_csv_line(&s.to_csv_line()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn csv_rejects_wrong_arity() {
        let err = Surface::from_csv_line("0,1,2,3,4,5").unwrap_err();
        assert!(matches!(err, PrescriptionError::CsvFieldCount { count: 6, .. }));

        let err = Surface::from_csv_line("0,1,2,3,4,5,6,name,extra").unwrap_err();
        assert!(matches!(err, PrescriptionError::CsvFieldCount { count: 9, .. }));
    }

    #[test]
    fn csv_rejects_bad_number() {
        let err = Surface::from_csv_line("0,1,2,three,4,5,6").unwrap_err();
        assert!(matches!(err, PrescriptionError::BadNumber { token } if token == "three"));
    }

    // ---- transform ----

    #[test]
    fn identity_transform_is_noop() {
        let mut s = sample_surface();
        let before = s.clone();
        s.transform(&RigidTransform::default());
        assert_eq!(s.coords, before.coords);
        assert!((s.tilts - before.tilts).norm() < 1e-12);
    }

    #[test]
    fn rotate_then_translate_within_one_call() {
        let r = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let mut s = Surface::new("0", Vector3::new(1.0, 0.0, 0.0), Vector3::zeros(), None);
        s.transform(&RigidTransform::new(r, Vector3::new(10.0, 0.0, 0.0)));
        // R·c first, then +T
        assert!((s.coords - Vector3::new(10.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn call_order_is_not_commutative() {
        let r = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let t1 = Vector3::new(1.0, 2.0, 3.0);
        let t2 = Vector3::new(-5.0, 0.0, 0.5);
        let c0 = Vector3::new(0.1, 0.0, -0.4);

        let mut a = Surface::new("0", c0, Vector3::zeros(), None);
        a.transform(&RigidTransform::new(r, t1));
        a.transform(&RigidTransform::from_translation(t2));
        assert!((a.coords - (r * c0 + t1 + t2)).norm() < 1e-12);

        let mut b = Surface::new("0", c0, Vector3::zeros(), None);
        b.transform(&RigidTransform::from_translation(t2));
        b.transform(&RigidTransform::new(r, t1));
        assert!((b.coords - (r * (c0 + t2) + t1)).norm() < 1e-12);

        assert!((a.coords - b.coords).norm() > 1e-6);
    }

    #[test]
    fn rotation_and_inverse_restore_coords() {
        let r = Matrix3::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0);
        let mut s = sample_surface();
        let before = s.clone();

        s.transform(&RigidTransform::from_rotation(r));
        s.transform(&RigidTransform::from_rotation(r.transpose()));

        assert!((s.coords - before.coords).norm() < 1e-12);
        let m_before = crate::transform::rotation_from_tilt_deg(&before.tilts);
        let m_after = crate::transform::rotation_from_tilt_deg(&s.tilts);
        assert!((m_after - m_before).norm() < 1e-9);
    }

    #[test]
    fn tilts_compose_through_matrices() {
        let r = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let mut s = sample_surface();
        let tilt_before = crate::transform::rotation_from_tilt_deg(&s.tilts);

        s.transform(&RigidTransform::from_rotation(r));

        let tilt_after = crate::transform::rotation_from_tilt_deg(&s.tilts);
        assert!((tilt_after - r * tilt_before).norm() < 1e-9);
    }

    // ---- Display ----

    #[test]
    fn display_includes_name_when_present() {
        let s = sample_surface();
        assert!(s.to_string().starts_with("Surf 0 (text):"));

        let unnamed = Surface::new("4", Vector3::zeros(), Vector3::zeros(), None);
        assert!(unnamed.to_string().starts_with("Surf 4:"));
    }
}
