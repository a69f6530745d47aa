//! Whole-pipeline runs through the driver: configuration in, files out,
//! with the non-linear transform reshaping the marginal distribution.

use ndarray::Array3;

use swell_cli::driver;
use swell_core::{stats, Real, SwellError};
use swell_io::SimulationConfig;

fn read_binary_surface(path: &std::path::Path, shape: (usize, usize, usize)) -> Array3<Real> {
    let bytes = std::fs::read(path).unwrap();
    let width = std::mem::size_of::<Real>();
    assert_eq!(bytes.len(), shape.0 * shape.1 * shape.2 * width);
    let values: Vec<Real> = bytes
        .chunks_exact(width)
        .map(|chunk| Real::from_be_bytes(chunk.try_into().unwrap()))
        .collect();
    Array3::from_shape_vec(shape, values).unwrap()
}

#[test]
fn ar_pipeline_writes_all_requested_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig::parse(
        "model = ar\n\
         acf = {\n\
         \x20   func = exponential\n\
         \x20   grid = (4,4,4):(3,3,3)\n\
         \x20   amplitude = 1.0\n\
         \x20   alpha = (0.7,0.9,0.9)\n\
         }\n\
         ar_model = {\n\
         \x20   order = (3,3,3)\n\
         }\n\
         out_grid = (48,16,16):(47,15,15)\n\
         partition = (8,8,8)\n\
         no_seed = true\n\
         prng_count = 256\n\
         output = summary,csv,binary,acf\n\
         velocity_potential_solver = {\n\
         \x20   func = linear\n\
         \x20   depth = 10\n\
         \x20   domain = (5,-3):(5,0):(1,4)\n\
         }\n",
    )
    .unwrap();
    driver::run(&config, dir.path(), 2).unwrap();
    for name in ["zeta.csv", "zeta.bin", "acf.csv", "phi.csv"] {
        let path = dir.path().join(name);
        assert!(path.exists(), "{name} missing");
        assert!(std::fs::metadata(&path).unwrap().len() > 0, "{name} empty");
    }
    let zeta = read_binary_surface(&dir.path().join("zeta.bin"), (48, 16, 16));
    assert!(zeta.iter().all(|v| v.is_finite()));
}

/// Scenario: a skew-normal transform (α = 2) applied to a unit-variance
/// Gaussian surface keeps the sample variance near `acf(0,0,0)` while the
/// skewness moves toward the target.
#[test]
fn nit_preserves_variance_and_shifts_skewness() {
    // Scale parameter making the target skew-normal itself unit-variance:
    // ω² = 1/(1 − 2δ²/π), δ = α/√(1+α²).
    let alpha: f64 = 2.0;
    let delta_sq = alpha * alpha / (1.0 + alpha * alpha);
    let omega = (1.0 / (1.0 - 2.0 * delta_sq / std::f64::consts::PI)).sqrt();
    // Center the target so the transformed process stays zero-mean; the
    // ACF correction equation needs a vanishing constant series term.
    let mean = -omega * delta_sq.sqrt() * (2.0 / std::f64::consts::PI).sqrt();
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig::parse(&format!(
        "model = ar\n\
         acf = {{\n\
         \x20   func = exponential\n\
         \x20   grid = (4,4,4):(3,3,3)\n\
         \x20   amplitude = 1.0\n\
         \x20   alpha = (0.7,0.9,0.9)\n\
         }}\n\
         ar_model = {{\n\
         \x20   order = (3,3,3)\n\
         }}\n\
         out_grid = (80,24,24):(79,23,23)\n\
         partition = (10,12,12)\n\
         no_seed = true\n\
         prng_count = 256\n\
         transform = {{\n\
         \x20   distribution = skew_normal\n\
         \x20   mean = {mean}\n\
         \x20   stdev = {omega}\n\
         \x20   alpha = {alpha}\n\
         }}\n\
         output = binary\n",
    ))
    .unwrap();
    driver::run(&config, dir.path(), 4).unwrap();
    let zeta = read_binary_surface(&dir.path().join("zeta.bin"), (80, 24, 24));
    // Discard the zero-boundary ramp-up region before estimating moments.
    let interior = zeta.slice(ndarray::s![12.., 6.., 6..]);
    let variance = stats::variance(&interior);
    let skewness = stats::skewness(&interior);
    assert!(
        (variance - 1.0).abs() < 0.05,
        "variance {variance} drifted more than 5% from acf(0,0,0)"
    );
    assert!(skewness > 0.2, "skewness {skewness} did not shift");
}

#[test]
fn unknown_configuration_keys_abort_the_run() {
    let err = SimulationConfig::parse("model = ar\nout_grid = (8,8,8)\nacf_grid = (4,4,4)\n")
        .unwrap_err();
    assert!(matches!(err, SwellError::Config(_)));
}

#[test]
fn exhausted_prng_pool_fails_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig::parse(
        "model = ar\n\
         acf = {\n\
         \x20   func = exponential\n\
         \x20   grid = (4,4,4):(3,3,3)\n\
         }\n\
         ar_model = {\n\
         \x20   order = (3,3,3)\n\
         }\n\
         out_grid = (40,40,40):(39,39,39)\n\
         partition = (10,10,10)\n\
         no_seed = true\n\
         prng_count = 10\n",
    )
    .unwrap();
    match driver::run(&config, dir.path(), 2) {
        Err(SwellError::PrngPoolExhausted {
            available,
            required,
        }) => {
            assert_eq!(available, 10);
            assert_eq!(required, 64);
        }
        other => panic!("expected pool exhaustion, got {other:?}"),
    }
}

#[test]
fn plain_wave_model_generates_without_randomness() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig::parse(
        "model = plain_wave\n\
         out_grid = (8,16,8):(7,15,7)\n\
         plain_wave = {\n\
         \x20   func = cos\n\
         \x20   amplitudes = [1.5]\n\
         \x20   wavenumbers_x = [0.25]\n\
         \x20   wavenumbers_y = [0]\n\
         \x20   velocities = [1]\n\
         \x20   phases = [0]\n\
         }\n\
         output = csv\n",
    )
    .unwrap();
    driver::run(&config, dir.path(), 1).unwrap();
    let text = std::fs::read_to_string(dir.path().join("zeta.csv")).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("t,x,y,z"));
    // The cosine profile starts at its crest.
    assert_eq!(lines.next(), Some("0,0,0,1.5"));
}
