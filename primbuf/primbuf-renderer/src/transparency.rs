//! Back-to-front ordering of translucent primitives.
//!
//! Orthographic views looking along a cardinal axis reduce depth order to a single coordinate, so
//! the sorter remembers the direction it last sorted for: turning to the opposite direction is a
//! reversal, staying put costs nothing, and only a new axis needs a comparison sort. Every other
//! view falls back to a full sort by squared distance from the camera.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;
use primbuf_api::{Camera, MaterialId, Primitive, PrimitiveSource, Projection};

use crate::error::{ContractViolation, RenderError};
use crate::layout::resolve_positions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardinalDirection {
    N,
    E,
    S,
    W,
}

impl CardinalDirection {
    /// Clockwise from north, matching [`Camera::ground_angle`].
    pub const ALL: [CardinalDirection; 4] = [Self::N, Self::E, Self::S, Self::W];

    /// Closest cardinal for an angle measured clockwise from north.
    pub fn closest(angle: f32) -> Self {
        let quadrant = (angle.rem_euclid(TAU) / FRAC_PI_2).round() as usize;
        Self::ALL[quadrant % 4]
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::E => Self::W,
            Self::S => Self::N,
            Self::W => Self::E,
        }
    }

    pub fn is_opposite_of(self, other: Option<Self>) -> bool {
        other == Some(self.opposite())
    }

    /// Sort key along this direction's axis: ascending keys are farthest-first for a camera
    /// looking in this direction.
    pub fn depth_key(self, point: Vec3) -> f32 {
        match self {
            Self::N => -point.z,
            Self::E => -point.x,
            Self::S => point.z,
            Self::W => point.x,
        }
    }
}

/// True if `angle` is within `tolerance` of a multiple of π/2.
pub fn is_axis_aligned(angle: f32, tolerance: f32) -> bool {
    let offset = angle.rem_euclid(FRAC_PI_2);
    offset.min(FRAC_PI_2 - offset) < tolerance
}

/// Arithmetic mean of `positions`; `None` when empty.
pub fn centroid(positions: &[Vec3]) -> Option<Vec3> {
    if positions.is_empty() {
        return None;
    }
    let sum: Vec3 = positions.iter().copied().sum();
    Some(sum / positions.len() as f32)
}

/// Centroid of a primitive's pool positions. Recomputed on every call.
pub fn primitive_centroid<S: PrimitiveSource + ?Sized>(
    primitive: &Primitive,
    source: &S,
) -> Result<Vec3, ContractViolation> {
    let positions = resolve_positions(primitive, source)?;
    centroid(&positions).ok_or(ContractViolation::TooFewIndices { found: 0 })
}

/// A translucent primitive, addressed by its material and its position in that material's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslucentEntry {
    pub material: MaterialId,
    pub primitive: usize,
}

impl TranslucentEntry {
    pub fn resolve<'s, S: PrimitiveSource + ?Sized>(&self, source: &'s S) -> Result<&'s Primitive, RenderError> {
        source
            .primitives(self.material)
            .get(self.primitive)
            .ok_or(RenderError::UnknownPrimitive {
                material: self.material,
                primitive: self.primitive,
            })
    }

    pub fn centroid<S: PrimitiveSource + ?Sized>(&self, source: &S) -> Result<Vec3, RenderError> {
        primitive_centroid(self.resolve(source)?, source)
            .map_err(|violation| RenderError::contract(self.material, self.primitive, violation))
    }
}

/// What a call to [`TransparencySorter::sort`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOutcome {
    /// Opposite of the previous cardinal: order reversed in place.
    Reversed(CardinalDirection),
    /// New cardinal axis: full sort along it.
    Resorted(CardinalDirection),
    /// Same cardinal as last frame: order kept.
    Unchanged(CardinalDirection),
    /// Perspective or off-axis view: full sort by distance.
    DistanceSorted,
}

#[derive(Debug)]
pub struct TransparencySorter {
    entries: Vec<TranslucentEntry>,
    last_direction: Option<CardinalDirection>,
    tolerance: f32,
}

impl TransparencySorter {
    pub fn new(tolerance: f32) -> Self {
        Self {
            entries: Vec::new(),
            last_direction: None,
            tolerance,
        }
    }

    /// Adding an entry invalidates the current order.
    pub fn push(&mut self, entry: TranslucentEntry) {
        self.entries.push(entry);
        self.last_direction = None;
    }

    pub fn entries(&self) -> &[TranslucentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direction of the last cardinal sort, `None` after a distance sort.
    pub fn last_direction(&self) -> Option<CardinalDirection> {
        self.last_direction
    }

    /// Cardinal fast-path direction for this view, if it applies.
    pub fn cardinal_for(&self, camera: &Camera, projection: &Projection) -> Option<CardinalDirection> {
        if !projection.orthographic {
            return None;
        }
        let angle = camera.ground_angle();
        is_axis_aligned(angle, self.tolerance).then(|| CardinalDirection::closest(angle))
    }

    /// Reorder entries back-to-front for the given view.
    pub fn sort<S: PrimitiveSource + ?Sized>(
        &mut self,
        source: &S,
        camera: &Camera,
        projection: &Projection,
    ) -> Result<SortOutcome, RenderError> {
        let outcome = match self.cardinal_for(camera, projection) {
            Some(direction) if direction.is_opposite_of(self.last_direction) => {
                self.entries.reverse();
                SortOutcome::Reversed(direction)
            }
            Some(direction) if self.last_direction != Some(direction) => {
                self.sort_by_key(source, |c| direction.depth_key(c))?;
                SortOutcome::Resorted(direction)
            }
            Some(direction) => SortOutcome::Unchanged(direction),
            None => {
                let eye = camera.position;
                self.sort_by_key(source, |c| -(c - eye).length_squared())?;
                SortOutcome::DistanceSorted
            }
        };
        let direction = match outcome {
            SortOutcome::Reversed(d) | SortOutcome::Resorted(d) | SortOutcome::Unchanged(d) => Some(d),
            SortOutcome::DistanceSorted => None,
        };
        if direction != self.last_direction {
            log::debug!("translucent sort: {:?} -> {:?}", self.last_direction, direction);
        }
        self.last_direction = direction;
        Ok(outcome)
    }

    /// Stable ascending sort by `key(centroid)`. Entries are untouched on error.
    fn sort_by_key<S, F>(&mut self, source: &S, key: F) -> Result<(), RenderError>
    where
        S: PrimitiveSource + ?Sized,
        F: Fn(Vec3) -> f32,
    {
        let mut keyed = self
            .entries
            .iter()
            .map(|entry| Ok((key(entry.centroid(source)?), *entry)))
            .collect::<Result<Vec<_>, RenderError>>()?;
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.entries = keyed.into_iter().map(|(_, entry)| entry).collect();
        Ok(())
    }
}
