//! Typed simulation configuration.
//!
//! Maps the parameter tree of a configuration file onto the solver and
//! generator types. Every block carries an explicit key whitelist, so a
//! misspelled key is rejected before any heavy computation starts.

use std::path::PathBuf;
use std::str::FromStr;

use swell_core::{Domain2, Grid3, Real, SwellError, SwellResult};
use swell_gen::LonguetHigginsModel;
use swell_model::nit::dist::{GramCharlier, SkewNormal, TargetDistribution};
use swell_model::{
    AcfGenerator, AcfParams, ArAlgorithm, ArSolver, MaAlgorithm, MaSolver, NitTransform,
    PlainWaveModel, PlainWaveProfile, Wave,
};
use swell_velocity::{HighAmplitudeSolver, LinearSolver};

use crate::output_flags::OutputFlags;
use crate::params::{parse_shape, parse_vector, Params};

/// The process model driving the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Ar,
    Ma,
    Arma,
    PlainWave,
    LonguetHiggins,
}

impl FromStr for ModelKind {
    type Err = SwellError;

    fn from_str(s: &str) -> SwellResult<Self> {
        match s {
            "ar" | "ar_model" => Ok(ModelKind::Ar),
            "ma" | "ma_model" => Ok(ModelKind::Ma),
            "arma" | "arma_model" => Ok(ModelKind::Arma),
            "plain_wave" => Ok(ModelKind::PlainWave),
            "longuet_higgins" => Ok(ModelKind::LonguetHiggins),
            other => Err(SwellError::Config(format!(
                "bad model \"{other}\"; supported values: \
                 ar, ma, arma, plain_wave, longuet_higgins"
            ))),
        }
    }
}

/// How the ACF is obtained.
#[derive(Debug, Clone)]
pub enum AcfSource {
    /// Analytic family sampled on a lag grid.
    Analytic {
        func: String,
        grid: Grid3,
        params: AcfParams,
    },
    /// Empirical construction from a decayed reference wave field.
    Generator(AcfGenerator),
}

/// Velocity-solver selection before the surface exists; the plain-wave
/// kernel borrows the plain-wave model from the top-level config.
#[derive(Debug, Clone)]
pub enum VelocitySolverConfig {
    Linear(LinearSolver),
    HighAmplitude(HighAmplitudeSolver),
    Plain { depth: Real, domain: Domain2 },
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub model: ModelKind,
    pub acf: AcfSource,
    pub ar: ArSolver,
    pub ma: MaSolver,
    pub out_grid: Grid3,
    pub partition: Option<[usize; 3]>,
    /// Deterministic run seed; `no_seed = true` forces seed zero for tests.
    pub seed: Option<u32>,
    /// Pre-generated MT parameter file; absent means a derived pool.
    pub mt_config_file: Option<PathBuf>,
    /// Size of the derived pool when no parameter file is given.
    pub prng_count: usize,
    pub transform: Option<NitTransform>,
    pub velocity: Option<VelocitySolverConfig>,
    pub output: OutputFlags,
    pub plain_wave: Option<PlainWaveModel>,
    pub longuet_higgins: Option<LonguetHigginsModel>,
}

impl SimulationConfig {
    pub fn parse(text: &str) -> SwellResult<Self> {
        let params = Params::parse(text)?;
        Self::from_params(&params)
    }

    pub fn from_params(params: &Params) -> SwellResult<Self> {
        params.expect_keys(&[
            "model",
            "acf",
            "ar_model",
            "ma_model",
            "out_grid",
            "partition",
            "seed",
            "no_seed",
            "mt_config_file",
            "prng_count",
            "transform",
            "velocity_potential_solver",
            "output",
            "verification",
            "plain_wave",
            "lh_model",
        ])?;
        let model: ModelKind = params.require("model")?.parse()?;
        let out_grid: Grid3 = params.require("out_grid")?.parse()?;
        out_grid.validate("out_grid")?;

        let acf = match params.block("acf")? {
            Some(block) => parse_acf(block)?,
            None => AcfSource::Generator(AcfGenerator::default()),
        };
        let ar = match params.block("ar_model")? {
            Some(block) => parse_ar(block)?,
            None => ArSolver::default(),
        };
        let ma = match params.block("ma_model")? {
            Some(block) => parse_ma(block)?,
            None => MaSolver::default(),
        };
        let partition = params
            .scalar("partition")?
            .map(parse_shape::<3>)
            .transpose()?;
        let no_seed = params.parse_or("no_seed", false)?;
        let seed = if no_seed {
            Some(0)
        } else {
            params.parse_opt::<u32>("seed")?
        };
        let mt_config_file = params
            .scalar("mt_config_file")?
            .map(|s| PathBuf::from(s.trim()));
        let prng_count = params.parse_or("prng_count", 4096usize)?;
        let transform = match params.block("transform")? {
            Some(block) => Some(parse_transform(block)?),
            None => None,
        };
        let velocity = match params.block("velocity_potential_solver")? {
            Some(block) => Some(parse_velocity(block)?),
            None => None,
        };
        // `verification` is the historical spelling of `output`.
        let mut output = OutputFlags::default();
        if let Some(s) = params.scalar("output")? {
            output = s.parse()?;
        }
        if let Some(s) = params.scalar("verification")? {
            let extra: OutputFlags = s.parse()?;
            if output.is_empty() {
                output = extra;
            }
        }
        let plain_wave = match params.block("plain_wave")? {
            Some(block) => Some(parse_plain_wave(block)?),
            None => None,
        };
        let longuet_higgins = match params.block("lh_model")? {
            Some(block) => Some(parse_lh(block)?),
            None => None,
        };
        if model == ModelKind::PlainWave && plain_wave.is_none() {
            return Err(SwellError::Config(
                "model = plain_wave requires a plain_wave block".into(),
            ));
        }
        if model == ModelKind::LonguetHiggins && longuet_higgins.is_none() {
            return Err(SwellError::Config(
                "model = longuet_higgins requires an lh_model block".into(),
            ));
        }
        Ok(Self {
            model,
            acf,
            ar,
            ma,
            out_grid,
            partition,
            seed,
            mt_config_file,
            prng_count,
            transform,
            velocity,
            output,
            plain_wave,
            longuet_higgins,
        })
    }
}

fn parse_acf(block: &Params) -> SwellResult<AcfSource> {
    if let Some(generator) = block.block("generator")? {
        block.expect_keys(&["generator"])?;
        return Ok(AcfSource::Generator(parse_acf_generator(generator)?));
    }
    block.expect_keys(&["func", "grid", "amplitude", "velocity", "alpha", "beta"])?;
    let func = block.require("func")?.to_string();
    let grid: Grid3 = block.require("grid")?.parse()?;
    grid.validate("acf.grid")?;
    let defaults = AcfParams::default();
    let params = AcfParams {
        amplitude: block.parse_or("amplitude", defaults.amplitude)?,
        velocity: block.parse_or("velocity", defaults.velocity)?,
        alpha: block
            .scalar("alpha")?
            .map(parse_vector::<3>)
            .transpose()?
            .unwrap_or(defaults.alpha),
        beta: block
            .scalar("beta")?
            .map(parse_vector::<3>)
            .transpose()?
            .unwrap_or(defaults.beta),
    };
    // Fail on unknown family names before any computation.
    swell_model::acf_function(&func)?;
    Ok(AcfSource::Analytic { func, grid, params })
}

fn parse_acf_generator(block: &Params) -> SwellResult<AcfGenerator> {
    block.expect_keys(&[
        "func",
        "amplitude",
        "velocity",
        "alpha",
        "beta",
        "nwaves",
        "var_eps",
        "chop_eps",
    ])?;
    let defaults = AcfGenerator::default();
    Ok(AcfGenerator {
        profile: block
            .scalar("func")?
            .map(str::parse::<PlainWaveProfile>)
            .transpose()?
            .unwrap_or(defaults.profile),
        amplitude: block.parse_or("amplitude", defaults.amplitude)?,
        velocity: block.parse_or("velocity", defaults.velocity)?,
        wavenum: block
            .scalar("beta")?
            .map(parse_vector::<2>)
            .transpose()?
            .unwrap_or(defaults.wavenum),
        alpha: block
            .scalar("alpha")?
            .map(parse_vector::<3>)
            .transpose()?
            .unwrap_or(defaults.alpha),
        nwaves: block.parse_or("nwaves", defaults.nwaves)?,
        var_epsilon: block.parse_or("var_eps", defaults.var_epsilon)?,
        chop_epsilon: block.parse_opt("chop_eps")?,
    })
}

fn parse_ar(block: &Params) -> SwellResult<ArSolver> {
    block.expect_keys(&["order", "algorithm", "least_squares", "eps", "chop_eps"])?;
    let defaults = ArSolver::default();
    let algorithm = match block.scalar("algorithm")? {
        None => defaults.algorithm,
        Some("gauss_elimination") => ArAlgorithm::GaussElimination,
        Some("choi_recursive") => ArAlgorithm::ChoiRecursive,
        Some(other) => {
            return Err(SwellError::Config(format!(
                "bad ar_model.algorithm \"{other}\"; supported values: \
                 gauss_elimination, choi_recursive"
            )))
        }
    };
    Ok(ArSolver {
        order: block
            .scalar("order")?
            .map(parse_shape::<3>)
            .transpose()?
            .unwrap_or(defaults.order),
        algorithm,
        least_squares: block.parse_or("least_squares", defaults.least_squares)?,
        eps: block.parse_or("eps", defaults.eps)?,
        chop_epsilon: block.parse_opt("chop_eps")?,
    })
}

fn parse_ma(block: &Params) -> SwellResult<MaSolver> {
    block.expect_keys(&[
        "order",
        "algorithm",
        "max_iterations",
        "eps",
        "min_var_wn",
        "max_residual",
    ])?;
    let defaults = MaSolver::default();
    let algorithm = match block.scalar("algorithm")? {
        None => defaults.algorithm,
        Some("fixed_point_iteration") => MaAlgorithm::FixedPointIteration,
        Some("newton_raphson") => MaAlgorithm::NewtonRaphson,
        Some(other) => {
            return Err(SwellError::Config(format!(
                "bad ma_model.algorithm \"{other}\"; supported values: \
                 fixed_point_iteration, newton_raphson"
            )))
        }
    };
    Ok(MaSolver {
        order: block
            .scalar("order")?
            .map(parse_shape::<3>)
            .transpose()?
            .unwrap_or(defaults.order),
        algorithm,
        max_iterations: block.parse_or("max_iterations", defaults.max_iterations)?,
        eps: block.parse_or("eps", defaults.eps)?,
        min_var_wn: block.parse_or("min_var_wn", defaults.min_var_wn)?,
        max_residual: block.parse_or("max_residual", defaults.max_residual)?,
    })
}

fn parse_transform(block: &Params) -> SwellResult<NitTransform> {
    block.expect_keys(&[
        "distribution",
        "mean",
        "stdev",
        "alpha",
        "skewness",
        "kurtosis",
        "interpolation_nodes",
        "max_interpolation_order",
        "max_expansion_order",
        "eps",
        "max_iterations",
    ])?;
    let distribution = match block.require("distribution")? {
        "skew_normal" => TargetDistribution::SkewNormal(SkewNormal {
            mean: block.parse_or("mean", 0.0)?,
            stdev: block.parse_or("stdev", 1.0)?,
            alpha: block.parse_or("alpha", 1.0)?,
        }),
        "gram_charlier" => TargetDistribution::GramCharlier(GramCharlier {
            skewness: block.parse_or("skewness", 0.0)?,
            kurtosis: block.parse_or("kurtosis", 0.0)?,
        }),
        other => {
            return Err(SwellError::Config(format!(
                "bad transform.distribution \"{other}\"; supported values: \
                 gram_charlier, skew_normal"
            )))
        }
    };
    let mut transform = NitTransform::new(distribution);
    transform.interpolation_nodes =
        block.parse_or("interpolation_nodes", transform.interpolation_nodes)?;
    transform.max_interpolation_order = block.parse_or(
        "max_interpolation_order",
        transform.max_interpolation_order,
    )?;
    transform.max_expansion_order =
        block.parse_or("max_expansion_order", transform.max_expansion_order)?;
    transform.eps = block.parse_or("eps", transform.eps)?;
    transform.max_iterations = block.parse_or("max_iterations", transform.max_iterations)?;
    Ok(transform)
}

fn parse_velocity(block: &Params) -> SwellResult<VelocitySolverConfig> {
    block.expect_keys(&["func", "depth", "domain"])?;
    let depth: Real = block.parse_or("depth", 10.0)?;
    let domain: Domain2 = block.require("domain")?.parse()?;
    match block.require("func")? {
        "linear" | "small_amplitude" => {
            Ok(VelocitySolverConfig::Linear(LinearSolver { depth, domain }))
        }
        "high_amplitude" => Ok(VelocitySolverConfig::HighAmplitude(HighAmplitudeSolver {
            depth,
            domain,
        })),
        "plain" => Ok(VelocitySolverConfig::Plain { depth, domain }),
        other => Err(SwellError::Config(format!(
            "bad velocity_potential_solver.func \"{other}\"; supported values: \
             linear, small_amplitude, high_amplitude, plain"
        ))),
    }
}

fn parse_plain_wave(block: &Params) -> SwellResult<PlainWaveModel> {
    block.expect_keys(&["func", "amplitudes", "wavenumbers_x", "wavenumbers_y", "velocities", "phases"])?;
    let profile: PlainWaveProfile = block.parse_or("func", PlainWaveProfile::Cosine)?;
    let amplitudes = parse_list(block.require("amplitudes")?)?;
    let kx = parse_list(block.require("wavenumbers_x")?)?;
    let ky = parse_list(block.require("wavenumbers_y")?)?;
    let velocities = parse_list(block.require("velocities")?)?;
    let phases = parse_list(block.require("phases")?)?;
    let n = amplitudes.len();
    if [kx.len(), ky.len(), velocities.len(), phases.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err(SwellError::Config(
            "plain_wave component lists have mismatched lengths".into(),
        ));
    }
    let waves = (0..n)
        .map(|i| Wave {
            amplitude: amplitudes[i],
            kx: kx[i],
            ky: ky[i],
            velocity: velocities[i],
            phase: phases[i],
        })
        .collect();
    let model = PlainWaveModel { profile, waves };
    model.validate()?;
    Ok(model)
}

fn parse_lh(block: &Params) -> SwellResult<LonguetHigginsModel> {
    block.expect_keys(&["spec_domain", "spec_subdomain", "wave_height"])?;
    Ok(LonguetHigginsModel {
        spec_domain: block.require("spec_domain")?.parse()?,
        spec_subdomain: block
            .scalar("spec_subdomain")?
            .map(parse_shape::<2>)
            .transpose()?
            .unwrap_or([1, 1]),
        wave_height: block.parse_or("wave_height", 2.0)?,
    })
}

/// A bracketed list `[a b c]` of reals, matching the historical wave-list
/// syntax.
fn parse_list(s: &str) -> SwellResult<Vec<Real>> {
    let bad = || SwellError::Config(format!("bad list: \"{s}\""));
    let inner = s
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(bad)?;
    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<Real>().map_err(|_| bad()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = "\
model = arma
acf = {
    func = propagating_wave
    grid = (10,10,10):(2.5,5,5)
    amplitude = 5.0
    velocity = 1.0
    alpha = (0.42,0.42,0.42)
    beta = (1.8,1.8,0)
}
ar_model = {
    order = (7,7,7)
    algorithm = gauss_elimination
    least_squares = false
}
ma_model = {
    order = (3,3,3)
    algorithm = fixed_point_iteration
    max_iterations = 1000
    eps = 1e-5
    min_var_wn = 1e-6
}
out_grid = (200,40,40):(199,39,39)
partition = (16,16,16)
seed = 42
output = summary,csv
velocity_potential_solver = {
    func = linear
    depth = 12
    domain = (0,-5):(10,0):(4,6)
}
";

    #[test]
    fn full_config_parses() {
        let config = SimulationConfig::parse(FULL_CONFIG).unwrap();
        assert_eq!(config.model, ModelKind::Arma);
        assert_eq!(config.ar.order, [7, 7, 7]);
        assert_eq!(config.ma.order, [3, 3, 3]);
        assert_eq!(config.out_grid.size(), [200, 40, 40]);
        assert_eq!(config.partition, Some([16, 16, 16]));
        assert_eq!(config.seed, Some(42));
        match &config.acf {
            AcfSource::Analytic { func, grid, params } => {
                assert_eq!(func, "propagating_wave");
                assert_eq!(grid.size(), [10, 10, 10]);
                assert_eq!(params.alpha, [0.42, 0.42, 0.42]);
            }
            other => panic!("unexpected acf source {other:?}"),
        }
        match config.velocity {
            Some(VelocitySolverConfig::Linear(solver)) => {
                assert_eq!(solver.depth, 12.0);
                assert_eq!(solver.domain.shape(), [4, 6]);
            }
            other => panic!("unexpected velocity config {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = SimulationConfig::parse("model = ar\nout_grid = (4,4,4)\nmodle = x\n")
            .unwrap_err();
        assert!(err.to_string().contains("modle"));
    }

    #[test]
    fn unknown_acf_family_is_rejected() {
        let text = "model = ar\nout_grid = (4,4,4)\nacf = {\n func = wavelet\n grid = (4,4,4)\n}\n";
        let err = SimulationConfig::parse(text).unwrap_err();
        assert!(err.to_string().contains("wavelet"));
    }

    #[test]
    fn no_seed_forces_zero() {
        let config =
            SimulationConfig::parse("model = ar\nout_grid = (4,4,4)\nno_seed = true\n").unwrap();
        assert_eq!(config.seed, Some(0));
    }

    #[test]
    fn acf_generator_block_with_explicit_chop() {
        let text = "model = ma\nout_grid = (8,8,8)\nacf = {\n generator = {\n \
                    func = cos\n nwaves = 2.5\n chop_eps = 1e-10\n }\n}\n";
        let config = SimulationConfig::parse(text).unwrap();
        match config.acf {
            AcfSource::Generator(gen) => {
                assert_eq!(gen.nwaves, 2.5);
                assert_eq!(gen.chop_epsilon, Some(1e-10));
            }
            other => panic!("unexpected acf source {other:?}"),
        }
    }

    #[test]
    fn plain_wave_model_lists_must_align() {
        let text = "model = plain_wave\nout_grid = (4,4,4)\nplain_wave = {\n \
                    func = cos\n amplitudes = [1 2]\n wavenumbers_x = [0.5]\n \
                    wavenumbers_y = [0 0]\n velocities = [1 1]\n phases = [0 0]\n}\n";
        assert!(SimulationConfig::parse(text).is_err());
    }
}
