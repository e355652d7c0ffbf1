//! Logical support-tree elements.
//!
//! Terminology:
//!
//! * Support point: the point on the model surface that needs support.
//! * Head: the pinhead touching the model, sharp end on the surface, dull
//!   end towards a pillar or bridge.
//! * Pillar: a strictly vertical truncated cone to the ground.
//! * Pedestal: the bed-adhesion base under a pillar.
//! * Bridge: a straight stick between two junctions.
//! * Junction: a small ball where sticks meet.
//! * Anchor: a reverse-oriented head fastening a branch into the model.
//!
//! Elements reference each other by integer id only; the builder owns all
//! of them in typed arenas, which keeps the whole tree cloneable and free
//! of ownership cycles.

use glam::DVec3;

use crate::geometry::DOWN;

/// Id of elements not (yet) part of a tree.
pub const ID_UNSET: i64 = -1;

/// A junction connecting bridges and pillars.
#[derive(Clone, Copy, Debug)]
pub struct Junction {
  pub id: i64,
  pub pos: DVec3,
  pub r: f64,
}

impl Junction {
  pub fn new(pos: DVec3, r: f64) -> Self {
    Self {
      id: ID_UNSET,
      pos,
      r,
    }
  }
}

/// A pinhead originating from a support point.
#[derive(Clone, Copy, Debug)]
pub struct Head {
  pub id: i64,
  pub dir: DVec3,
  pub pos: DVec3,

  pub r_back_mm: f64,
  pub r_pin_mm: f64,
  pub width_mm: f64,
  pub penetration_mm: f64,

  /// Id of the pillar this head connects to, if any.
  pub pillar_id: i64,
  /// Id of the bridge leaving this head, if any.
  pub bridge_id: i64,
}

impl Head {
  pub fn new(
    r_back_mm: f64,
    r_pin_mm: f64,
    width_mm: f64,
    penetration_mm: f64,
    dir: DVec3,
    pos: DVec3,
  ) -> Self {
    Self {
      id: ID_UNSET,
      dir,
      pos,
      r_back_mm,
      r_pin_mm,
      width_mm,
      penetration_mm,
      pillar_id: ID_UNSET,
      bridge_id: ID_UNSET,
    }
  }

  pub fn invalidate(&mut self) {
    self.id = ID_UNSET;
  }

  pub fn is_valid(&self) -> bool {
    self.id >= 0
  }

  /// Pin tip to back sphere, ignoring penetration.
  pub fn real_width(&self) -> f64 {
    2. * self.r_pin_mm + self.width_mm + 2. * self.r_back_mm
  }

  /// The length the head occupies outside the model.
  pub fn fullwidth(&self) -> f64 {
    self.real_width() - self.penetration_mm
  }

  /// The junction at the center of the back sphere. Junctions derived from
  /// heads carry the negated head id.
  pub fn junction(&self) -> Junction {
    let mut j = Junction::new(
      self.pos + (self.fullwidth() - self.r_back_mm) * self.dir,
      self.r_back_mm,
    );
    j.id = -self.id;
    j
  }

  pub fn junction_point(&self) -> DVec3 {
    self.junction().pos
  }
}

/// A reverse pinhead anchoring a branch into the model body.
#[derive(Clone, Copy, Debug)]
pub struct Anchor(pub Head);

impl Anchor {
  pub fn new(
    r_back_mm: f64,
    r_pin_mm: f64,
    width_mm: f64,
    penetration_mm: f64,
    dir: DVec3,
    pos: DVec3,
  ) -> Self {
    Self(Head::new(r_back_mm, r_pin_mm, width_mm, penetration_mm, dir, pos))
  }

  pub fn fullwidth(&self) -> f64 {
    self.0.fullwidth()
  }

  pub fn junction_point(&self) -> DVec3 {
    self.0.junction_point()
  }
}

/// A strictly vertical truncated cone. Only the endpoint (on or near the
/// ground) and the height are stored; an explicit start point would allow
/// the pillar to be angled.
#[derive(Clone, Copy, Debug)]
pub struct Pillar {
  pub id: i64,
  pub endpt: DVec3,
  pub height: f64,
  pub r_start: f64,
  pub r_end: f64,

  /// Whether the pillar hangs under a head (as opposed to a junction).
  pub starts_from_head: bool,
  pub start_junction_id: i64,

  /// Number of bridges landing on this pillar.
  pub bridges: u32,
  /// Number of pillars interconnected with this one.
  pub links: u32,
}

impl Pillar {
  pub fn new(endpt: DVec3, height: f64, r_start: f64, r_end: f64) -> Self {
    Self {
      id: ID_UNSET,
      endpt,
      height,
      r_start,
      r_end,
      starts_from_head: false,
      start_junction_id: ID_UNSET,
      bridges: 0,
      links: 0,
    }
  }

  pub fn start_point(&self) -> DVec3 {
    DVec3::new(self.endpt.x, self.endpt.y, self.endpt.z + self.height)
  }

  pub fn end_point(&self) -> DVec3 {
    self.endpt
  }
}

/// Bed-adhesion base under a pillar.
#[derive(Clone, Copy, Debug)]
pub struct Pedestal {
  pub id: i64,
  pub pos: DVec3,
  pub height: f64,
  pub r_bottom: f64,
  pub r_top: f64,
}

impl Pedestal {
  pub fn new(pos: DVec3, height: f64, r_bottom: f64, r_top: f64) -> Self {
    Self {
      id: ID_UNSET,
      pos,
      height,
      r_bottom,
      r_top,
    }
  }
}

/// A straight cylindrical stick between two junction points.
#[derive(Clone, Copy, Debug)]
pub struct Bridge {
  pub id: i64,
  pub r: f64,
  pub startp: DVec3,
  pub endp: DVec3,
}

impl Bridge {
  pub fn new(startp: DVec3, endp: DVec3, r: f64) -> Self {
    Self {
      id: ID_UNSET,
      r,
      startp,
      endp,
    }
  }

  pub fn get_length(&self) -> f64 {
    (self.endp - self.startp).length()
  }

  pub fn get_dir(&self) -> DVec3 {
    (self.endp - self.startp).normalize_or(DOWN)
  }
}

/// A truncated-cone bridge; the radius varies linearly along it.
#[derive(Clone, Copy, Debug)]
pub struct DiffBridge {
  pub id: i64,
  pub r: f64,
  pub end_r: f64,
  pub startp: DVec3,
  pub endp: DVec3,
}

impl DiffBridge {
  pub fn new(startp: DVec3, endp: DVec3, r: f64, end_r: f64) -> Self {
    Self {
      id: ID_UNSET,
      r,
      end_r,
      startp,
      endp,
    }
  }

  pub fn between(start: &Junction, end: &Junction) -> Self {
    Self::new(start.pos, end.pos, start.r, end.r)
  }

  pub fn get_length(&self) -> f64 {
    (self.endp - self.startp).length()
  }

  pub fn get_dir(&self) -> DVec3 {
    (self.endp - self.startp).normalize_or(DOWN)
  }
}
