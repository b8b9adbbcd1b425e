use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use nalgebra::Vector3;

use super::model::{parse_float, PrescriptionError, Surface};

// ---------------------------------------------------------------------------
// Prescription text layout
// ---------------------------------------------------------------------------

/// Literal banner the exporting tool prints above the coordinate table.
const TABLE_MARKER: &str =
    "GLOBAL VERTEX COORDINATES, ORIENTATIONS, AND ROTATION/OFFSET MATRICES";

/// The table begins this many lines after the marker line.
const MARKER_TO_TABLE_OFFSET: usize = 8;

/// Each surface record occupies 3 data rows plus 1 blank separator row.
const RECORD_STRIDE: usize = 4;

// Column indices of the first data row. Columns 1-3 hold rotation-matrix
// remnants that are not modeled. Continuation rows lack the surface index,
// shifting their columns left by one.
const COL_SURF: usize = 0;
const COL_POS: usize = 4;
const COL_TILT: usize = 5;
const COL_NAME: usize = 6;

// ---------------------------------------------------------------------------
// File-level entry points
// ---------------------------------------------------------------------------

/// Read and parse a prescription export file.
///
/// The export is decoded as UTF-8 first; when that fails it is re-decoded
/// as UTF-16 (the exporting tool writes either, depending on version).
pub fn read_prescription_file(path: &Path) -> Result<Vec<Surface>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading prescription file {}", path.display()))?;
    let text =
        decode_export(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    let surfaces =
        parse_prescription(&text).with_context(|| format!("parsing {}", path.display()))?;

    info!(
        "loaded {} surfaces from {}",
        surfaces.len(),
        path.display()
    );
    Ok(surfaces)
}

/// Decode export bytes: UTF-8 preferred, UTF-16 fallback.
pub fn decode_export(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => decode_utf16(bytes),
    }
}

fn decode_utf16(bytes: &[u8]) -> Result<String> {
    // BOM selects the byte order; exports without one are little-endian.
    let (little_endian, payload) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        rest => (true, rest),
    };

    if payload.len() % 2 != 0 {
        bail!("input is neither valid UTF-8 nor UTF-16 (odd byte length)");
    }

    let units = payload.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .context("input is neither valid UTF-8 nor UTF-16")
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

/// Parse decoded prescription text into surfaces, in beam-path order.
///
/// The table starts [`MARKER_TO_TABLE_OFFSET`] lines after the last line
/// containing [`TABLE_MARKER`]; a missing marker is a fatal error. Parsing
/// stops at two consecutive blank lines, which end the table before any
/// later report sections.
pub fn parse_prescription(text: &str) -> Result<Vec<Surface>, PrescriptionError> {
    let lines: Vec<&str> = text.lines().collect();

    let marker = lines
        .iter()
        .rposition(|line| line.contains(TABLE_MARKER))
        .ok_or(PrescriptionError::MissingTableMarker)?;
    let table = lines.get(marker + MARKER_TO_TABLE_OFFSET..).unwrap_or(&[]);

    let mut surfaces = Vec::new();
    let mut row = 0;
    while row < table.len() {
        if table[row].trim().is_empty() && row > 0 && table[row - 1].trim().is_empty() {
            break;
        }
        let record = table
            .get(row..row + 3)
            .ok_or(PrescriptionError::TruncatedRecord { line: row })?;
        surfaces.push(parse_record(record)?);
        row += RECORD_STRIDE;
    }

    warn_on_duplicate_names(&surfaces);
    Ok(surfaces)
}

/// Build one surface from its 3 data rows.
fn parse_record(rows: &[&str]) -> Result<Surface, PrescriptionError> {
    let first: Vec<&str> = rows[0].split_whitespace().collect();
    if first.len() < COL_NAME {
        return Err(PrescriptionError::MalformedRow {
            tokens: first.iter().map(|t| t.to_string()).collect(),
        });
    }

    let index = first[COL_SURF].to_string();
    let mut coords = Vector3::zeros();
    let mut tilts = Vector3::zeros();
    coords[0] = parse_float(first[COL_POS])?;
    tilts[0] = parse_float(first[COL_TILT])?;

    let name = if first.len() > COL_NAME {
        Some(first[COL_NAME..].join(" "))
    } else {
        None
    };

    for (i, row) in rows[1..].iter().enumerate() {
        let tokens: Vec<&str> = row.split_whitespace().collect();
        // no surface index on continuation rows; columns shift left by one
        if tokens.len() < COL_TILT {
            return Err(PrescriptionError::MalformedRow {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
            });
        }
        coords[i + 1] = parse_float(tokens[COL_POS - 1])?;
        tilts[i + 1] = parse_float(tokens[COL_TILT - 1])?;
    }

    Ok(Surface {
        index,
        coords,
        tilts,
        name,
    })
}

/// Duplicate non-null names are worth flagging (CAD keys collide) but do
/// not fail the load.
fn warn_on_duplicate_names(surfaces: &[Surface]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in surfaces.iter().filter_map(|s| s.name.as_deref()) {
        *counts.entry(name).or_default() += 1;
    }

    let duplicates: Vec<&str> = counts
        .iter()
        .filter(|(_, &count)| count > 1)
        .map(|(&name, _)| name)
        .collect();
    if !duplicates.is_empty() {
        warn!("duplicate surface names in prescription data: {duplicates:?}");
    }
}

// ---------------------------------------------------------------------------
// CSV I/O
// ---------------------------------------------------------------------------

/// Load surfaces from a headerless CSV file, one record per surface:
/// `index,x,y,z,tilt_x,tilt_y,tilt_z[,name]`. File order is surface order.
pub fn load_csv(path: &Path) -> Result<Vec<Surface>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let mut surfaces = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let fields: Vec<&str> = record.iter().collect();
        surfaces.push(
            Surface::from_csv_fields(&fields).with_context(|| format!("CSV row {row_no}"))?,
        );
    }
    Ok(surfaces)
}

/// Write surfaces to a headerless CSV file, one record per surface.
pub fn write_csv(path: &Path, surfaces: &[Surface]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating CSV {}", path.display()))?;

    for surface in surfaces {
        writer
            .write_record(surface.csv_fields())
            .with_context(|| format!("writing CSV record for surface {}", surface.index))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}
