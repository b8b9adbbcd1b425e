//! Convert Zemax OpticStudio prescription exports into CAD variable files.
//!
//! The input is the *Global Vertex Coordinates, Orientations, and
//! Rotation/Offset Matrices* text report; the output is a flat file of
//! variable assignments (`"<identifier>_<COMPONENT>[_<config>]" = <value>`)
//! that a CAD package can link equations against. In between, surface poses
//! can be re-expressed in a different reference frame via rigid-body
//! transforms and restricted to the surfaces and components of interest.
//!
//! # Example
//!
//! ```no_run
//! use zemax_to_cad::{filter, MultiConfigSystem, RigidTransform, StateSubset};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut system = MultiConfigSystem::load_from_multiple_configs(
//!     &["hdllr_c1.txt", "hdllr_c2.txt"],
//!     None,
//! )?;
//!
//! // re-express everything with the optical bench corner as the origin
//! system.transform(
//!     &RigidTransform::translation(-510.0, 200.0, 150.0),
//!     filter::include_all,
//! );
//!
//! let mut out = std::fs::File::create("output.txt")?;
//! system.file_write(
//!     &mut out,
//!     filter::named_any(&["OAP 1", "DM", "Fold mirror"]),
//!     filter::components(vec![StateSubset::X, StateSubset::Y, StateSubset::Z]),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`data`] — surface model, prescription/CSV loading, filter helpers.
//! - [`system`] — configurations and multi-configuration fan-out.
//! - [`transform`] — rigid-body transforms and rotation-vector conversions.

pub mod data;
pub mod system;
pub mod transform;

pub use data::filter;
pub use data::model::{PrescriptionError, StateSubset, Surface};
pub use system::{MultiConfigSystem, OpticalConfiguration, SurfaceRef, DEFAULT_CONFIG_NUMBER};
pub use transform::{is_rotation_matrix, RigidTransform};
