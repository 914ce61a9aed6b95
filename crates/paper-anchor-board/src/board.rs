//! Board definition: which marker fills which quadrilateral slot, and where
//! the slots sit on the physical page.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// A corner of a square, in TL, TR, BR, BL order (clockwise on screen).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Position in TL, TR, BR, BL order.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }
}

/// What one marker id contributes to the quadrilateral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRole {
    /// Corner of the marker (in its own orientation) that is extracted.
    pub marker_corner: Corner,
    /// Quadrilateral slot that corner fills.
    pub slot: Corner,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleMapError {
    #[error("slot {0:?} is assigned to more than one marker")]
    DuplicateSlot(Corner),
    #[error("marker corner {0:?} is used by more than one marker")]
    DuplicateMarkerCorner(Corner),
}

/// Bijection from marker id (`0..4`) to [`MarkerRole`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[MarkerRole; 4]", into = "[MarkerRole; 4]")]
pub struct MarkerRoleMap {
    roles: [MarkerRole; 4],
}

impl MarkerRoleMap {
    /// Markers at the page corners, each contributing its inner corner:
    /// id 0 top-left, id 1 top-right, id 2 bottom-right, id 3 bottom-left.
    pub const DEFAULT: Self = Self {
        roles: [
            MarkerRole {
                marker_corner: Corner::BottomRight,
                slot: Corner::TopLeft,
            },
            MarkerRole {
                marker_corner: Corner::BottomLeft,
                slot: Corner::TopRight,
            },
            MarkerRole {
                marker_corner: Corner::TopLeft,
                slot: Corner::BottomRight,
            },
            MarkerRole {
                marker_corner: Corner::TopRight,
                slot: Corner::BottomLeft,
            },
        ],
    };

    /// Number of markers on the board.
    pub const MARKER_COUNT: usize = 4;

    /// Validate that slots and marker corners are both permutations.
    pub fn new(roles: [MarkerRole; 4]) -> Result<Self, RoleMapError> {
        let mut slot_used = [false; 4];
        let mut corner_used = [false; 4];
        for role in &roles {
            if std::mem::replace(&mut slot_used[role.slot.index()], true) {
                return Err(RoleMapError::DuplicateSlot(role.slot));
            }
            if std::mem::replace(&mut corner_used[role.marker_corner.index()], true) {
                return Err(RoleMapError::DuplicateMarkerCorner(role.marker_corner));
            }
        }
        Ok(Self { roles })
    }

    /// Role of marker `id`, `None` for ids outside the board.
    #[inline]
    pub fn role(&self, id: u32) -> Option<MarkerRole> {
        self.roles.get(id as usize).copied()
    }

    #[inline]
    pub fn roles(&self) -> &[MarkerRole; 4] {
        &self.roles
    }

    /// Marker id filling `slot`.
    pub fn id_for_slot(&self, slot: Corner) -> u32 {
        // `new` guarantees every slot appears exactly once.
        self.roles
            .iter()
            .position(|r| r.slot == slot)
            .unwrap_or(slot.index()) as u32
    }
}

impl Default for MarkerRoleMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<[MarkerRole; 4]> for MarkerRoleMap {
    type Error = RoleMapError;

    fn try_from(roles: [MarkerRole; 4]) -> Result<Self, Self::Error> {
        Self::new(roles)
    }
}

impl From<MarkerRoleMap> for [MarkerRole; 4] {
    fn from(map: MarkerRoleMap) -> Self {
        map.roles
    }
}

/// Physical board: a square of side `board_side` with a marker of side
/// `marker_size` in each corner. Object points are in meters on `z = 0`,
/// x right and y down from the board's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardLayout {
    /// Object points in slot order (TL, TR, BR, BL).
    pub object_points: [Point3<f64>; 4],
    pub marker_size: f64,
    pub board_side: f64,
}

/// Letter-paper width in meters.
pub const LETTER_WIDTH_M: f64 = 0.2159;
const DEFAULT_MARKER_SIZE_M: f64 = 0.05;

impl BoardLayout {
    /// Layout whose object points are the inner marker corners.
    pub fn square(board_side: f64, marker_size: f64) -> Self {
        let near = marker_size;
        let far = board_side - marker_size;
        Self {
            object_points: [
                Point3::new(near, near, 0.0),
                Point3::new(far, near, 0.0),
                Point3::new(far, far, 0.0),
                Point3::new(near, far, 0.0),
            ],
            marker_size,
            board_side,
        }
    }

    /// Object point for `slot`.
    #[inline]
    pub fn object_point(&self, slot: Corner) -> Point3<f64> {
        self.object_points[slot.index()]
    }

    /// Centroid of the object points.
    pub fn center(&self) -> Point3<f64> {
        let sum = self
            .object_points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / 4.0)
    }

    /// Top-left corner (board coordinates) of the marker at page corner `slot`.
    pub fn marker_origin(&self, slot: Corner) -> Point2<f64> {
        let far = self.board_side - self.marker_size;
        match slot {
            Corner::TopLeft => Point2::new(0.0, 0.0),
            Corner::TopRight => Point2::new(far, 0.0),
            Corner::BottomRight => Point2::new(far, far),
            Corner::BottomLeft => Point2::new(0.0, far),
        }
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::square(LETTER_WIDTH_M, DEFAULT_MARKER_SIZE_M)
    }
}

/// Four image points in slot order (TL, TR, BR, BL).
///
/// Only [`assemble_quadrilateral`](crate::assemble_quadrilateral) builds
/// one, so every slot comes from an observed marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Quadrilateral {
    corners: [Point2<f64>; 4],
}

impl Quadrilateral {
    pub(crate) fn from_slots(corners: [Point2<f64>; 4]) -> Self {
        Self { corners }
    }

    #[inline]
    pub fn corners(&self) -> &[Point2<f64>; 4] {
        &self.corners
    }

    #[inline]
    pub fn corner(&self, slot: Corner) -> Point2<f64> {
        self.corners[slot.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_role_map_is_a_bijection() {
        let map = MarkerRoleMap::DEFAULT;
        assert!(MarkerRoleMap::new(*map.roles()).is_ok());

        let mut slots: Vec<usize> = map.roles().iter().map(|r| r.slot.index()).collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        for slot in Corner::ALL {
            let id = map.id_for_slot(slot);
            assert_eq!(map.role(id).map(|r| r.slot), Some(slot));
        }
        assert!(map.role(4).is_none());
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let mut roles = *MarkerRoleMap::DEFAULT.roles();
        roles[3].slot = Corner::TopLeft;
        assert_eq!(
            MarkerRoleMap::new(roles),
            Err(RoleMapError::DuplicateSlot(Corner::TopLeft))
        );
    }

    #[test]
    fn role_map_deserialization_validates() {
        let json = serde_json::to_string(&MarkerRoleMap::DEFAULT).expect("serialize");
        let back: MarkerRoleMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, MarkerRoleMap::DEFAULT);

        let bad = json.replace("\"slot\":\"top_right\"", "\"slot\":\"top_left\"");
        assert!(serde_json::from_str::<MarkerRoleMap>(&bad).is_err());
    }

    #[test]
    fn default_layout_matches_letter_page() {
        let layout = BoardLayout::default();
        assert_relative_eq!(layout.object_points[0], Point3::new(0.05, 0.05, 0.0));
        assert_relative_eq!(
            layout.object_points[2],
            Point3::new(0.1659, 0.1659, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(layout.center().x, 0.10795, epsilon = 1e-12);
        // Each marker's contributed corner is the layout's object point.
        let map = MarkerRoleMap::DEFAULT;
        for slot in Corner::ALL {
            let role = map.role(map.id_for_slot(slot)).expect("role");
            let o = layout.marker_origin(slot);
            let m = layout.marker_size;
            let (dx, dy) = match role.marker_corner {
                Corner::TopLeft => (0.0, 0.0),
                Corner::TopRight => (m, 0.0),
                Corner::BottomRight => (m, m),
                Corner::BottomLeft => (0.0, m),
            };
            let p = layout.object_point(slot);
            assert_relative_eq!(p.x, o.x + dx, epsilon = 1e-12);
            assert_relative_eq!(p.y, o.y + dy, epsilon = 1e-12);
        }
    }
}
