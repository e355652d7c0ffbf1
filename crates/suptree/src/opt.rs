//! Bounded, deterministic numerical search.
//!
//! The placement and routing optimisers need a derivative-free global
//! search over two or three box-bounded variables. This module provides a
//! multistart Nelder-Mead: seeded uniform restarts over the bounds drive a
//! bounded simplex descent, and a stop score lets callers end the search
//! the moment a good-enough solution appears. All randomness comes from a
//! fixed seed, so repeated runs produce identical trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Termination thresholds. Unset thresholds are `NAN` and ignored.
#[derive(Clone, Copy, Debug)]
pub struct StopCriteria {
  max_iterations: usize,
  rel_score_diff: f64,
  abs_score_diff: f64,
  stop_score: f64,
}

impl Default for StopCriteria {
  fn default() -> Self {
    Self {
      max_iterations: 100,
      rel_score_diff: 1e-6,
      abs_score_diff: f64::NAN,
      stop_score: f64::NAN,
    }
  }
}

impl StopCriteria {
  pub fn max_iterations(mut self, it: usize) -> Self {
    self.max_iterations = it;
    self
  }

  pub fn rel_score_diff(mut self, diff: f64) -> Self {
    self.rel_score_diff = diff;
    self
  }

  pub fn abs_score_diff(mut self, diff: f64) -> Self {
    self.abs_score_diff = diff;
    self
  }

  pub fn stop_score(mut self, score: f64) -> Self {
    self.stop_score = score;
    self
  }

  pub fn get_max_iterations(&self) -> usize {
    self.max_iterations
  }
}

#[derive(Clone, Copy, Debug)]
pub struct OptResult<const N: usize> {
  pub score: f64,
  pub optimum: [f64; N],
}

#[derive(Clone, Debug)]
pub struct Optimizer {
  criteria: StopCriteria,
  loc_criteria: StopCriteria,
  seed: u64,
  maximize: bool,
}

impl Optimizer {
  pub fn new(criteria: StopCriteria) -> Self {
    Self {
      criteria,
      loc_criteria: StopCriteria::default().max_iterations(60),
      seed: 0,
      maximize: false,
    }
  }

  /// Criteria for the local simplex descents within the global search.
  pub fn set_local_criteria(mut self, criteria: StopCriteria) -> Self {
    self.loc_criteria = criteria;
    self
  }

  pub fn seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  pub fn to_max(mut self) -> Self {
    self.maximize = true;
    self
  }

  pub fn to_min(mut self) -> Self {
    self.maximize = false;
    self
  }

  pub fn optimize<const N: usize, F>(
    &self,
    f: F,
    init: [f64; N],
    bounds: [(f64, f64); N],
  ) -> OptResult<N>
  where
    F: Fn(&[f64; N]) -> f64,
  {
    let mut search = Search {
      f: &f,
      bounds,
      maximize: self.maximize,
      stop_score: self.criteria.stop_score,
      evals: 0,
      max_evals: self.criteria.max_iterations.max(1),
      best_raw: if self.maximize {
        f64::NEG_INFINITY
      } else {
        f64::INFINITY
      },
      best_x: clamp_into(init, &bounds),
      done: false,
    };

    let mut rng = StdRng::seed_from_u64(self.seed);
    let mut start = clamp_into(init, &bounds);

    loop {
      search.nelder_mead(start, &self.loc_criteria);
      if search.done || search.evals >= search.max_evals {
        break;
      }

      start = std::array::from_fn(|i| {
        let (lo, hi) = bounds[i];
        if hi > lo {
          rng.random_range(lo..hi)
        } else {
          lo
        }
      });
    }

    OptResult {
      score: search.best_raw,
      optimum: search.best_x,
    }
  }
}

fn clamp_into<const N: usize>(x: [f64; N], bounds: &[(f64, f64); N]) -> [f64; N] {
  std::array::from_fn(|i| {
    let (lo, hi) = bounds[i];
    x[i].clamp(lo, hi.max(lo))
  })
}

struct Search<'a, F, const N: usize> {
  f: &'a F,
  bounds: [(f64, f64); N],
  maximize: bool,
  stop_score: f64,
  evals: usize,
  max_evals: usize,
  best_raw: f64,
  best_x: [f64; N],
  done: bool,
}

impl<F, const N: usize> Search<'_, F, N>
where
  F: Fn(&[f64; N]) -> f64,
{
  // Internally everything minimises; raw scores are negated when the
  // caller asked for maximisation. Non-finite scores become pessimal
  // sentinels instead of propagating.
  fn eval(&mut self, x: &[f64; N]) -> f64 {
    if self.done || self.evals >= self.max_evals {
      return f64::INFINITY;
    }
    self.evals += 1;

    // NaN becomes the pessimal sentinel for the search direction;
    // infinities keep their meaning (an infinite clearance is a perfectly
    // good maximisation score).
    let mut raw = (self.f)(x);
    if raw.is_nan() || (self.maximize && raw == f64::NEG_INFINITY) {
      raw = if self.maximize { 0. } else { f64::INFINITY };
    }

    let better = if self.maximize {
      raw > self.best_raw
    } else {
      raw < self.best_raw
    };
    if better {
      self.best_raw = raw;
      self.best_x = *x;
    }

    if self.stop_score.is_finite() {
      let reached = if self.maximize {
        raw >= self.stop_score
      } else {
        raw <= self.stop_score
      };
      if reached {
        self.done = true;
      }
    }

    if self.maximize {
      -raw
    } else {
      raw
    }
  }

  fn nelder_mead(&mut self, start: [f64; N], criteria: &StopCriteria) {
    const ALPHA: f64 = 1.;
    const GAMMA: f64 = 2.;
    const RHO: f64 = 0.5;
    const SIGMA: f64 = 0.5;

    let bounds = self.bounds;
    let clamp = |x: [f64; N]| clamp_into(x, &bounds);

    // Initial simplex: the start point plus one vertex nudged per axis.
    let mut simplex: Vec<([f64; N], f64)> = Vec::with_capacity(N + 1);
    let s0 = clamp(start);
    let v0 = self.eval(&s0);
    simplex.push((s0, v0));
    for i in 0..N {
      let (lo, hi) = bounds[i];
      let span = hi - lo;
      let mut p = s0;
      let step = if span > 0. { 0.1 * span } else { 1e-9 };
      p[i] = if p[i] + step <= hi { p[i] + step } else { p[i] - step };
      let p = clamp(p);
      let v = self.eval(&p);
      simplex.push((p, v));
    }

    for _ in 0..criteria.max_iterations {
      if self.done || self.evals >= self.max_evals {
        return;
      }

      simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
      let best = simplex[0].1;
      let worst = simplex[N].1;

      // Convergence of the simplex values.
      let spread = worst - best;
      if criteria.abs_score_diff.is_finite() && spread <= criteria.abs_score_diff {
        return;
      }
      if criteria.rel_score_diff.is_finite()
        && spread <= criteria.rel_score_diff * best.abs().max(1e-12)
      {
        return;
      }

      // Centroid of all but the worst vertex.
      let centroid: [f64; N] = std::array::from_fn(|i| {
        simplex[..N].iter().map(|(p, _)| p[i]).sum::<f64>() / N as f64
      });

      let reflect = clamp(std::array::from_fn(|i| {
        centroid[i] + ALPHA * (centroid[i] - simplex[N].0[i])
      }));
      let v_reflect = self.eval(&reflect);

      if v_reflect < simplex[0].1 {
        let expand = clamp(std::array::from_fn(|i| {
          centroid[i] + GAMMA * (reflect[i] - centroid[i])
        }));
        let v_expand = self.eval(&expand);
        simplex[N] = if v_expand < v_reflect {
          (expand, v_expand)
        } else {
          (reflect, v_reflect)
        };
      } else if v_reflect < simplex[N - 1].1 {
        simplex[N] = (reflect, v_reflect);
      } else {
        let contract = clamp(std::array::from_fn(|i| {
          centroid[i] + RHO * (simplex[N].0[i] - centroid[i])
        }));
        let v_contract = self.eval(&contract);
        if v_contract < simplex[N].1 {
          simplex[N] = (contract, v_contract);
        } else {
          // Shrink towards the best vertex.
          for k in 1..=N {
            let p = clamp(std::array::from_fn(|i| {
              simplex[0].0[i] + SIGMA * (simplex[k].0[i] - simplex[0].0[i])
            }));
            let v = self.eval(&p);
            simplex[k] = (p, v);
          }
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "opt_test.rs"]
mod opt_test;
