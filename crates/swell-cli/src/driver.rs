//! Pipeline driver.
//!
//! Owns the ACF and every large array of the run, handing immutable views
//! forward through the stages: ACF construction, coefficient fitting,
//! partitioned generation, the optional non-linear transform, the optional
//! velocity-potential solve, and the selected outputs. No stage keeps a
//! back-reference to another.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use ndarray::{Array3, Array4, ArrayView3};
use tracing::{info, warn};

use swell_core::{stats, DiscreteFunction3, Grid3, Real, SwellError, SwellResult};
use swell_gen::{MtConfigPool, SurfaceGenerator};
use swell_io::{
    config::VelocitySolverConfig, AcfSource, BinaryWriter, Flag, ModelKind, SimulationConfig,
};
use swell_model::{acf_variance, ArmaSolver};
use swell_velocity::{PlainWaveSolver, VelocityPotentialSolver};

/// Run one simulation described by the configuration. Output files are
/// placed in `out_dir`.
pub fn run(config: &SimulationConfig, out_dir: &Path, workers: usize) -> SwellResult<()> {
    let cancel = AtomicBool::new(false);
    run_cancellable(config, out_dir, workers, &cancel)
}

pub fn run_cancellable(
    config: &SimulationConfig,
    out_dir: &Path,
    workers: usize,
    cancel: &AtomicBool,
) -> SwellResult<()> {
    let out_grid = config.out_grid;
    let zeta = generate_surface(config, out_dir, workers, cancel)?;
    let zeta = DiscreteFunction3::new(zeta, out_grid);
    write_surface_outputs(config, out_dir, &zeta)?;
    solve_velocity_potential(config, out_dir, &zeta)?;
    Ok(())
}

fn generate_surface(
    config: &SimulationConfig,
    out_dir: &Path,
    workers: usize,
    cancel: &AtomicBool,
) -> SwellResult<Array3<Real>> {
    match config.model {
        ModelKind::PlainWave => {
            let model = config
                .plain_wave
                .as_ref()
                .expect("validated by the config parser");
            model.validate()?;
            info!(waves = model.waves.len(), "plain wave model");
            Ok(model.generate(&config.out_grid))
        }
        ModelKind::LonguetHiggins => {
            let model = config
                .longuet_higgins
                .as_ref()
                .expect("validated by the config parser");
            info!(wave_height = model.wave_height, "Longuet-Higgins model");
            model.generate(&config.out_grid, config.seed.unwrap_or(0))
        }
        ModelKind::Ar | ModelKind::Ma | ModelKind::Arma => {
            generate_random_process_surface(config, out_dir, workers, cancel)
        }
    }
}

fn generate_random_process_surface(
    config: &SimulationConfig,
    out_dir: &Path,
    workers: usize,
    cancel: &AtomicBool,
) -> SwellResult<Array3<Real>> {
    // 1. The ACF.
    let (mut acf, acf_grid) = build_acf(config)?;
    let variance = acf_variance(&acf);
    info!(variance, shape = ?acf.dim(), "ACF ready");
    if !(variance > 0.0) {
        return Err(SwellError::Validation(format!(
            "bad ACF variance: {variance}"
        )));
    }
    if config.output.isset(Flag::Acf) {
        let acf_fn = DiscreteFunction3::new(acf.clone(), acf_grid);
        swell_io::write_csv(
            &out_dir.join("acf.csv"),
            acf_fn.data().view(),
            acf_fn.grid(),
            ',',
        )?;
    }

    // 2. The ACF correction of the non-linear transform happens before any
    //    fitting, so the transformed process reproduces the requested
    //    covariance.
    if let Some(transform) = &config.transform {
        transform.transform_acf(&mut acf)?;
        info!("ACF corrected for the non-linear transform");
    }
    // The generated Gaussian field carries the corrected variance; the
    // pointwise transform maps it onto the requested one.
    let generated_variance = acf_variance(&acf);

    // 3. Coefficients and the white-noise variance.
    let pool = load_pool(config)?;
    let generator = SurfaceGenerator {
        out_grid: config.out_grid,
        partition: config.partition,
        workers,
        seed: config.seed,
    };

    // 4. Generation, with the optional streaming binary writer.
    let streaming = streams_binary(config);
    let mut zeta = match config.model {
        ModelKind::Ar => {
            let fit = config.ar.fit(acf.view())?;
            info!(var_wn = fit.var_wn, "AR fit is stationary");
            if streaming {
                let writer = Mutex::new(BinaryWriter::create(&out_dir.join("zeta.bin"))?);
                let on_slab = |view: ArrayView3<'_, Real>, _t0: usize| -> SwellResult<()> {
                    writer.lock().expect("writer lock poisoned").write_view(view)
                };
                let result = generator.generate_ar(&fit, &pool, cancel, Some(&on_slab));
                let writer = writer.into_inner().expect("writer lock poisoned");
                match result {
                    Ok(zeta) => {
                        writer.finish()?;
                        zeta
                    }
                    Err(err) => {
                        writer.abort()?;
                        return Err(err);
                    }
                }
            } else {
                generator.generate_ar(&fit, &pool, cancel, None)?
            }
        }
        ModelKind::Ma => {
            let fit = config.ma.fit(acf.view())?;
            info!(
                var_wn = fit.var_wn,
                iterations = fit.iterations,
                residual = fit.residual,
                "MA fit is invertible"
            );
            generator.generate_ma(&fit, &pool, cancel)?
        }
        ModelKind::Arma => {
            let solver = ArmaSolver {
                ar: config.ar.clone(),
                ma: config.ma.clone(),
            };
            let fit = solver.fit(acf.view())?;
            info!(var_wn = fit.var_wn, "ARMA fit accepted");
            generator.generate_arma(&fit, &pool, cancel)?
        }
        _ => unreachable!("random-process models only"),
    };

    // 5. The pointwise transform of the realisation.
    if let Some(transform) = &config.transform {
        transform.transform_realisation(generated_variance, &mut zeta)?;
        info!("realisation transformed to the target distribution");
    }
    Ok(zeta)
}

/// The binary surface can be streamed slab by slab only when slabs are
/// final as soon as their partitions complete: the AR wavefront qualifies,
/// but a pending pointwise transform does not.
fn streams_binary(config: &SimulationConfig) -> bool {
    config.output.isset(Flag::Binary)
        && config.model == ModelKind::Ar
        && config.transform.is_none()
}

fn build_acf(config: &SimulationConfig) -> SwellResult<(Array3<Real>, Grid3)> {
    match &config.acf {
        AcfSource::Analytic { func, grid, params } => {
            let family = swell_model::acf_function(func)?;
            Ok((family(params, grid), *grid))
        }
        AcfSource::Generator(generator) => Ok(generator.generate()),
    }
}

fn load_pool(config: &SimulationConfig) -> SwellResult<MtConfigPool> {
    match &config.mt_config_file {
        Some(path) => {
            let pool = MtConfigPool::read(path)?;
            info!(streams = pool.len(), file = %path.display(), "loaded MT configuration pool");
            Ok(pool)
        }
        None => Ok(MtConfigPool::generate(
            config.prng_count,
            config.seed.unwrap_or(0),
        )),
    }
}

fn write_surface_outputs(
    config: &SimulationConfig,
    out_dir: &Path,
    zeta: &DiscreteFunction3,
) -> SwellResult<()> {
    let flags = config.output;
    if flags.isset(Flag::Summary) {
        let data = zeta.data();
        info!(
            mean = stats::mean(data),
            variance = stats::variance(data),
            skewness = stats::skewness(data),
            kurtosis = stats::kurtosis(data),
            "surface summary"
        );
    }
    if flags.isset(Flag::Qq) || flags.isset(Flag::Waves) {
        warn!("qq and waves outputs belong to the post-analysis tools");
    }
    if flags.isset(Flag::Csv) || flags.isset(Flag::Surface) {
        let path: PathBuf = out_dir.join("zeta.csv");
        swell_io::write_csv(&path, zeta.data().view(), zeta.grid(), ',')?;
        info!(file = %path.display(), "wrote surface CSV");
    }
    if flags.isset(Flag::Blitz) {
        let path = out_dir.join("zeta.blitz");
        swell_io::write_text(&path, zeta.data().view())?;
        info!(file = %path.display(), "wrote surface text dump");
    }
    // The AR path streams zeta.bin during generation; every other
    // combination writes it here in one pass.
    if flags.isset(Flag::Binary) && !streams_binary(config) {
        let path = out_dir.join("zeta.bin");
        let mut writer = BinaryWriter::create(&path)?;
        writer.write_all(zeta.data().view())?;
        writer.finish()?;
        info!(file = %path.display(), "wrote binary surface");
    }
    Ok(())
}

fn solve_velocity_potential(
    config: &SimulationConfig,
    out_dir: &Path,
    zeta: &DiscreteFunction3,
) -> SwellResult<()> {
    let Some(velocity) = &config.velocity else {
        return Ok(());
    };
    let solver = match velocity {
        VelocitySolverConfig::Linear(solver) => VelocityPotentialSolver::Linear(solver.clone()),
        VelocitySolverConfig::HighAmplitude(solver) => {
            VelocityPotentialSolver::HighAmplitude(solver.clone())
        }
        VelocitySolverConfig::Plain { depth, domain } => {
            let model = config.plain_wave.clone().ok_or_else(|| {
                SwellError::Config(
                    "velocity_potential_solver.func = plain requires a plain_wave block".into(),
                )
            })?;
            VelocityPotentialSolver::Plain(PlainWaveSolver {
                model,
                depth: *depth,
                domain: *domain,
            })
        }
    };
    info!(solver = solver.name(), "computing velocity potential");
    let phi: Array4<Real> = solver.solve(zeta)?;
    let domain = match velocity {
        VelocitySolverConfig::Linear(s) => s.domain,
        VelocitySolverConfig::HighAmplitude(s) => s.domain,
        VelocitySolverConfig::Plain { domain, .. } => *domain,
    };
    if config.output.isset(Flag::Csv) {
        let path = out_dir.join("phi.csv");
        swell_io::write_potential_csv(&path, phi.view(), &domain, zeta.grid(), ',')?;
        info!(file = %path.display(), "wrote potential CSV");
    }
    if config.output.isset(Flag::Binary) {
        let path = out_dir.join("phi.bin");
        let mut writer = BinaryWriter::create(&path)?;
        writer.write_view4(phi.view())?;
        writer.finish()?;
        info!(file = %path.display(), "wrote binary potential");
    }
    Ok(())
}
