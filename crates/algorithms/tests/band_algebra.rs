//! End-to-end band algebra over GeoTIFFs written to a temporary directory.
//!
//! Each test writes a small synthetic multiband raster, reopens it through the
//! native reader and drives role resolution and formula evaluation exactly as
//! a run does.

use bandcalc_algorithms::imagery::{
    composite, evaluate, resolve_roles, BandRole, BandRoleMap, CompositeMode, FormulaSelector,
    SpectralIndex, DEFAULT_LABEL, DESCRIPTIONS_LABEL,
};
use bandcalc_core::io::{write_geotiff, BandSource, Dataset, GeoTiffOptions};
use bandcalc_core::{ComputationResult, DataType, Error, GeoTransform, RasterProfile, CRS};
use ndarray::Array3;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROWS: usize = 6;
const COLS: usize = 8;

fn profile(bands: usize) -> RasterProfile {
    RasterProfile::new(COLS, ROWS, bands, DataType::U16)
        .with_transform(GeoTransform::new(500_000.0, 4_200_000.0, 30.0, -30.0))
        .with_crs(Some(CRS::from_epsg(32633, false)))
}

/// Band `b` holds DN values around `b * 100`
fn dn_stack(bands: usize) -> ComputationResult {
    let data = Array3::from_shape_fn((bands, ROWS, COLS), |(b, r, c)| {
        ((b + 1) * 100 + r * 13 + c * 7) as f32
    });
    ComputationResult::new(data).unwrap()
}

fn write_stack(dir: &Path, name: &str, bands: usize, descriptions: Vec<Option<String>>) -> PathBuf {
    let path = dir.join(name);
    let options = GeoTiffOptions { descriptions };
    write_geotiff(&path, &dn_stack(bands), &profile(bands), Some(options)).unwrap();
    path
}

fn open_with_roles(path: &Path) -> (Dataset, BandRoleMap, String) {
    let ds = Dataset::open(path).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    let descriptions = ds.descriptions().to_vec();
    let resolution = resolve_roles(&name, || Ok(descriptions));
    (ds, resolution.map, resolution.label)
}

#[test]
fn generic_five_band_file_uses_default_mapping() {
    let dir = TempDir::new().unwrap();
    let path = write_stack(dir.path(), "field_plot.tif", 5, vec![]);

    let (_, roles, label) = open_with_roles(&path);
    assert_eq!(label, DEFAULT_LABEL);
    assert_eq!(roles.get(BandRole::Nir), Some(4));
    assert_eq!(roles.get(BandRole::Swir), Some(5));
}

#[test]
fn band_descriptions_drive_role_mapping() {
    let dir = TempDir::new().unwrap();
    let descriptions = vec![
        Some("Blue".into()),
        Some("Green".into()),
        Some("Red".into()),
        Some("Near Infrared".into()),
    ];
    let path = write_stack(dir.path(), "drone_survey.tif", 4, descriptions);

    let (mut ds, roles, label) = open_with_roles(&path);
    assert_eq!(label, DESCRIPTIONS_LABEL);
    assert_eq!(roles.get(BandRole::Red), Some(3));
    assert_eq!(roles.get(BandRole::Nir), Some(4));

    let result = evaluate(&FormulaSelector::Index(SpectralIndex::NDVI), &roles, &mut ds).unwrap();
    // nir = 400 + x, red = 300 + x
    let v = result.channel(0)[[0, 0]];
    assert!((v - 100.0 / 700.0).abs() < 1e-5, "Expected {}, got {}", 100.0 / 700.0, v);
}

#[test]
fn expression_matches_named_index_on_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reflectance.tif");
    // Band 4 is red, band 5 is nir; column 0 has nir = -red
    let data = Array3::from_shape_fn((5, ROWS, COLS), |(b, r, c)| {
        let red = 0.02 + 0.013 * (r * COLS + c) as f32;
        match (b, c) {
            (3, _) => red,
            (4, 0) => -red,
            (4, _) => red * 1.7 + 0.05,
            _ => 0.25,
        }
    });
    let f32_profile = profile(5).with_dtype(DataType::F32);
    write_geotiff(&path, &ComputationResult::new(data).unwrap(), &f32_profile, None).unwrap();
    let roles = BandRoleMap::from_pairs(&[(BandRole::Red, 4), (BandRole::Nir, 5)]);

    let mut ds = Dataset::open(&path).unwrap();
    let ndvi = evaluate(&FormulaSelector::Index(SpectralIndex::NDVI), &roles, &mut ds).unwrap();
    let mut ds = Dataset::open(&path).unwrap();
    let expr = evaluate(
        &FormulaSelector::Expression("(b5-b4)/(b5+b4)".into()),
        &roles,
        &mut ds,
    )
    .unwrap();

    assert_eq!(ndvi.data(), expr.data());
    assert!(ndvi.channel(0)[[0, 0]].abs() > 1_000.0);
}

#[test]
fn identical_nir_and_red_give_zeros() {
    let dir = TempDir::new().unwrap();
    let path = write_stack(dir.path(), "plot.tif", 3, vec![]);
    let roles = BandRoleMap::from_pairs(&[(BandRole::Red, 2), (BandRole::Nir, 2)]);

    let mut ds = Dataset::open(&path).unwrap();
    let result = evaluate(&FormulaSelector::Index(SpectralIndex::NDVI), &roles, &mut ds).unwrap();
    assert!(result.data().iter().all(|&v| v == 0.0));
}

#[test]
fn band_past_count_names_index_and_count() {
    let dir = TempDir::new().unwrap();
    let path = write_stack(dir.path(), "plot.tif", 3, vec![]);
    let roles = BandRoleMap::from_pairs(&[(BandRole::Red, 1), (BandRole::Nir, 4)]);

    let mut ds = Dataset::open(&path).unwrap();
    let err = evaluate(&FormulaSelector::Index(SpectralIndex::RVI), &roles, &mut ds).unwrap_err();
    assert!(matches!(err, Error::BandIndexOutOfRange { index: 4, count: 3 }));
    let msg = err.to_string();
    assert!(msg.contains('4') && msg.contains('3'), "{}", msg);
}

#[test]
fn composite_and_write_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = write_stack(dir.path(), "plot.tif", 4, vec![]);

    let mut ds = Dataset::open(&path).unwrap();
    let rgb = composite(&mut ds, [3, 2, 1], CompositeMode::Display).unwrap();
    let out_profile = ds
        .profile()
        .clone()
        .with_band_count(3)
        .with_dtype(CompositeMode::Display.output_dtype(ds.profile().dtype));

    let out = dir.path().join("rgb.tif");
    write_geotiff(&out, &rgb, &out_profile, None).unwrap();

    let mut reopened = Dataset::open(&out).unwrap();
    assert_eq!(reopened.profile().dtype, DataType::U8);
    assert!(reopened.profile().same_grid(ds.profile()));
    assert_eq!(reopened.read_band(1).unwrap(), rgb.channel(0).to_owned());
}

#[test]
fn tci_writes_three_bands_with_source_grid() {
    let dir = TempDir::new().unwrap();
    let path = write_stack(dir.path(), "plot.tif", 5, vec![]);
    let (mut ds, roles, _) = open_with_roles(&path);

    let tci = evaluate(&FormulaSelector::Index(SpectralIndex::TCI), &roles, &mut ds).unwrap();
    let out_profile = ds.profile().clone().with_band_count(3).with_dtype(DataType::F32);
    let out = dir.path().join("tci.tif");
    write_geotiff(&out, &tci, &out_profile, None).unwrap();

    let reopened = Dataset::open(&out).unwrap();
    assert_eq!(reopened.band_count(), 3);
    assert_eq!(reopened.profile().crs, ds.profile().crs);
    assert_eq!(reopened.bounds(), ds.bounds());
}
