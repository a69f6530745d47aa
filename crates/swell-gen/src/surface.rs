//! Partitioned generation of the wavy surface.
//!
//! Drives a fitted AR, MA or mixed process with Gaussian white noise over
//! the output grid. Noise is drawn per partition from that partition's own
//! PRNG stream, so the surface is a deterministic function of the partition
//! shape, the PRNG pool and the seed, independent of the worker count.

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicBool;

use ndarray::{Array3, ArrayView3};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, info};

use swell_core::{Grid3, Real, SwellError, SwellResult};
use swell_fft::{Cmplx, Convolution};
use swell_model::{ArFit, ArmaFit, MaFit};

use crate::partition::{make_partitions, num_partitions, partition_shape, Partition};
use crate::pool::MtConfigPool;
use crate::mt::ParallelMt;
use crate::wavefront::{LatticeTask, Wavefront};

/// Shared dense storage accessed by disjoint partitions without locking.
///
/// The wavefront protocol guarantees that a cell is written by exactly one
/// task and read by other tasks only after that task's partition is marked
/// complete under the scheduler mutex, which orders the accesses.
struct SharedSurface<'a> {
    cell: &'a UnsafeCell<Array3<Real>>,
    dims: [usize; 3],
}

unsafe impl Send for SharedSurface<'_> {}
unsafe impl Sync for SharedSurface<'_> {}

impl<'a> SharedSurface<'a> {
    fn new(cell: &'a UnsafeCell<Array3<Real>>) -> Self {
        let dims = unsafe { (*cell.get()).dim() };
        Self {
            cell,
            dims: [dims.0, dims.1, dims.2],
        }
    }

    #[inline]
    fn offset(&self, t: usize, x: usize, y: usize) -> usize {
        (t * self.dims[1] + x) * self.dims[2] + y
    }

    #[inline]
    unsafe fn read(&self, t: usize, x: usize, y: usize) -> Real {
        *(*self.cell.get()).as_ptr().add(self.offset(t, x, y))
    }

    #[inline]
    unsafe fn write(&self, t: usize, x: usize, y: usize, value: Real) {
        *(*self.cell.get()).as_mut_ptr().add(self.offset(t, x, y)) = value;
    }

    #[inline]
    unsafe fn add(&self, t: usize, x: usize, y: usize, value: Real) {
        *(*self.cell.get()).as_mut_ptr().add(self.offset(t, x, y)) += value;
    }

    /// A shared view of `count` completed leading-axis levels starting at
    /// `t0`. Sound only once every partition touching those levels is
    /// complete, because the region is never written again.
    unsafe fn slab_view(&self, t0: usize, count: usize) -> ArrayView3<'_, Real> {
        ArrayView3::from_shape_ptr(
            (count, self.dims[1], self.dims[2]),
            (*self.cell.get()).as_ptr().add(self.offset(t0, 0, 0)),
        )
    }
}

/// A partition plus its private PRNG stream.
struct GenerateTask {
    part: Partition,
    rng: ParallelMt,
}

impl LatticeTask for GenerateTask {
    fn ijk(&self) -> [usize; 3] {
        self.part.ijk
    }
}

/// Callback writing one completed leading time slab; receives the slab
/// contents and the first time index it covers.
pub type SlabWriter<'a> = &'a (dyn Fn(ArrayView3<'_, Real>, usize) -> SwellResult<()> + Sync);

/// Configuration of the partitioned generator.
#[derive(Debug, Clone)]
pub struct SurfaceGenerator {
    pub out_grid: Grid3,
    /// Explicit partition block shape; `None` selects the heuristic.
    pub partition: Option<[usize; 3]>,
    /// Worker count; 0 means the hardware thread count.
    pub workers: usize,
    /// Deterministic run seed; `None` draws one from the clock
    /// ("unseeded" test mode passes `Some(0)`).
    pub seed: Option<u32>,
}

impl SurfaceGenerator {
    pub fn new(out_grid: Grid3) -> Self {
        Self {
            out_grid,
            partition: None,
            workers: 0,
            seed: None,
        }
    }

    fn run_seed(&self) -> u32 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
                .unwrap_or(0)
        })
    }

    /// Split the grid and attach one PRNG stream per partition, in visit
    /// order. Pool exhaustion is reported here, before any generation.
    fn plan(
        &self,
        order: [usize; 3],
        pool: &MtConfigPool,
    ) -> SwellResult<(Vec<GenerateTask>, [usize; 3])> {
        let shape = self.out_grid.size();
        let workers = if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        };
        let partshape = partition_shape(self.partition, shape, order, workers);
        let nparts = num_partitions(shape, partshape);
        let parts = make_partitions(shape, partshape);
        info!(?partshape, total = parts.len(), "partitioned output grid");
        let streams = pool.instantiate(parts.len(), self.run_seed())?;
        let tasks = parts
            .into_iter()
            .zip(streams)
            .map(|(part, rng)| GenerateTask { part, rng })
            .collect();
        Ok((tasks, nparts))
    }

    /// Generate an autoregressive surface.
    ///
    /// Each partition draws its own white noise directly into `ζ`, then
    /// applies the AR recursion reading already-completed neighbors.
    pub fn generate_ar(
        &self,
        fit: &ArFit,
        pool: &MtConfigPool,
        cancel: &AtomicBool,
        on_slab: Option<SlabWriter<'_>>,
    ) -> SwellResult<Array3<Real>> {
        let var_wn = fit.var_wn;
        if var_wn < 0.0 || !var_wn.is_finite() {
            return Err(SwellError::Validation(format!(
                "bad white noise variance: {var_wn}"
            )));
        }
        debug!(var_wn, "white noise variance");
        let order = fit.phi.dim();
        let (tasks, nparts) = self.plan([order.0, order.1, order.2], pool)?;
        let [n0, n1, n2] = self.out_grid.size();
        let zeta = UnsafeCell::new(Array3::<Real>::zeros((n0, n1, n2)));
        let surface = SharedSurface::new(&zeta);
        let phi = &fit.phi;
        let slab_height = tasks
            .first()
            .map(|t| t.part.upper[0] - t.part.lower[0])
            .unwrap_or(n0);
        let surface_ref = &surface;
        let writer = on_slab.map(|w| {
            move |slab: usize| -> SwellResult<()> {
                let t0 = slab * slab_height;
                let count = slab_height.min(n0 - t0);
                let view = unsafe { surface_ref.slab_view(t0, count) };
                w(view, t0)
            }
        });
        Wavefront::new(nparts, self.workers).run(
            tasks,
            |mut task: GenerateTask| {
                // Noise first, recursion second; both stay inside the
                // partition except for reads of completed neighbors.
                unsafe {
                    fill_white_noise(&surface, &task.part, var_wn, &mut task.rng);
                    ar_generate_surface(&surface, phi, &task.part);
                }
            },
            cancel,
            writer
                .as_ref()
                .map(|w| w as &(dyn Fn(usize) -> SwellResult<()> + Sync)),
        )?;
        Ok(zeta.into_inner())
    }

    /// Generate a moving-average surface: per-partition noise, then one
    /// whole-array convolution with the MA kernel.
    pub fn generate_ma(
        &self,
        fit: &MaFit,
        pool: &MtConfigPool,
        cancel: &AtomicBool,
    ) -> SwellResult<Array3<Real>> {
        let eps = self.generate_noise_field(fit.var_wn, &fit.theta, pool, cancel)?;
        ma_convolve(&eps, &fit.theta)
    }

    /// Generate a mixed ARMA surface: the MA pass seeds `ζ`, then the AR
    /// recursion runs in place over it.
    pub fn generate_arma(
        &self,
        fit: &ArmaFit,
        pool: &MtConfigPool,
        cancel: &AtomicBool,
    ) -> SwellResult<Array3<Real>> {
        let eps = self.generate_noise_field(fit.var_wn, &fit.ar.phi, pool, cancel)?;
        let seeded = ma_convolve(&eps, &fit.ma.theta)?;
        drop(eps);
        let order = fit.ar.phi.dim();
        let (tasks, nparts) = self.plan([order.0, order.1, order.2], pool)?;
        let zeta = UnsafeCell::new(seeded);
        let surface = SharedSurface::new(&zeta);
        let phi = &fit.ar.phi;
        Wavefront::new(nparts, self.workers).run(
            tasks,
            |task: GenerateTask| unsafe {
                ar_generate_surface(&surface, phi, &task.part);
            },
            cancel,
            None,
        )?;
        Ok(zeta.into_inner())
    }

    /// Draw the white-noise field partitionwise. Noise tasks have no data
    /// dependencies, so they run embarrassingly parallel; determinism comes
    /// from the per-partition streams.
    fn generate_noise_field(
        &self,
        var_wn: Real,
        order_like: &Array3<Real>,
        pool: &MtConfigPool,
        cancel: &AtomicBool,
    ) -> SwellResult<Array3<Real>> {
        if var_wn < 0.0 || !var_wn.is_finite() {
            return Err(SwellError::Validation(format!(
                "bad white noise variance: {var_wn}"
            )));
        }
        let order = order_like.dim();
        let (tasks, _) = self.plan([order.0, order.1, order.2], pool)?;
        let [n0, n1, n2] = self.out_grid.size();
        let eps = UnsafeCell::new(Array3::<Real>::zeros((n0, n1, n2)));
        let surface = SharedSurface::new(&eps);
        if cancel.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(SwellError::Other("generation cancelled".into()));
        }
        tasks.into_par_iter().for_each(|mut task| unsafe {
            fill_white_noise(&surface, &task.part, var_wn, &mut task.rng);
        });
        Ok(eps.into_inner())
    }
}

/// Draw Gaussian white noise of the given variance into one partition, in
/// row-major cell order.
unsafe fn fill_white_noise(
    surface: &SharedSurface<'_>,
    part: &Partition,
    var_wn: Real,
    rng: &mut ParallelMt,
) {
    let normal = Normal::new(0.0, (var_wn as f64).sqrt()).expect("variance is non-negative");
    for t in part.lower[0]..part.upper[0] {
        for x in part.lower[1]..part.upper[1] {
            for y in part.lower[2]..part.upper[2] {
                let sample: f64 = normal.sample(rng);
                surface.write(t, x, y, sample as Real);
            }
        }
    }
}

/// Apply the AR recursion inside one partition:
/// `ζ(t,x,y) += Σ φ(k,i,j)·ζ(t−k, x−i, y−j)`, window clipped at the lower
/// grid border. Reads stay componentwise at or below the current cell, so
/// they land in this partition's already-updated cells or in completed
/// predecessors.
unsafe fn ar_generate_surface(
    surface: &SharedSurface<'_>,
    phi: &Array3<Real>,
    part: &Partition,
) {
    let (p0, p1, p2) = phi.dim();
    for t in part.lower[0]..part.upper[0] {
        for x in part.lower[1]..part.upper[1] {
            for y in part.lower[2]..part.upper[2] {
                let m1 = p0.min(t + 1);
                let m2 = p1.min(x + 1);
                let m3 = p2.min(y + 1);
                let mut sum = 0.0;
                for k in 0..m1 {
                    for i in 0..m2 {
                        for j in 0..m3 {
                            sum += phi[[k, i, j]] * surface.read(t - k, x - i, y - j);
                        }
                    }
                }
                surface.add(t, x, y, sum);
            }
        }
    }
}

/// The MA equation as a convolution: `ζ = ε − Σ_{h≠0} θ_h·ε_{·−h}`, i.e.
/// the kernel is `−θ` with `+1` substituted at the origin. Sliced along
/// time with overlap padding covering the kernel extent; the spatial axes
/// use the transform length of the surface and therefore wrap.
fn ma_convolve(eps: &Array3<Real>, theta: &Array3<Real>) -> SwellResult<Array3<Real>> {
    let (nt, nx, ny) = eps.dim();
    let (q0, _, _) = theta.dim();
    let mut kernel = theta.mapv(|v| Cmplx::new(-v, 0.0));
    kernel[[0, 0, 0]] = Cmplx::new(1.0, 0.0);
    let padding = (q0 - 1).min(nt.saturating_sub(1));
    let block = nt - padding;
    let conv = Convolution::new(&[q0.min(nt), nx, ny], 0, block, padding)?;
    let signal = eps.mapv(|v| Cmplx::new(v, 0.0)).into_dyn();
    let out = conv.convolve(&signal, &kernel.into_dyn())?;
    let out = out
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|err| SwellError::Other(err.to_string()))?;
    Ok(out.mapv(|v| v.re))
}
