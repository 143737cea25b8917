use serde::{Deserialize, Serialize};

/// A point annotation, in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMarker {
    pub x: u32,
    pub y: u32,
}

/// An axis-aligned box annotation with normalized corners
/// (`x1 < x2`, `y1 < y2`), in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxMarker {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoxMarker {
    /// Builds a box from two corner clicks, in either order. Returns
    /// `None` when the corners share a row or column, since a box with
    /// zero extent on any axis is not a box.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Option<Self> {
        let (x1, x2) = (a.0.min(b.0), a.0.max(b.0));
        let (y1, y2) = (a.1.min(b.1), a.1.max(b.1));
        if x1 == x2 || y1 == y2 {
            return None;
        }
        Some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// One committed annotation of either kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Point(PointMarker),
    Box(BoxMarker),
}

impl Marker {
    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::Point(_) => MarkerKind::Point,
            Marker::Box(_) => MarkerKind::Box,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    Point,
    Box,
}

/// All committed markers in commit order, regardless of kind.
///
/// The ordered history is the single source of truth: the per-kind views
/// are filters over it, and undo pops whatever was committed last. That
/// keeps point and box bookkeeping impossible to desynchronize.
#[derive(Debug, Default)]
pub struct MarkerStore {
    history: Vec<Marker>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, x: u32, y: u32) -> PointMarker {
        let marker = PointMarker { x, y };
        self.history.push(Marker::Point(marker));
        marker
    }

    /// Commits a box built from two corners; `None` (and no history
    /// entry) when the corners are degenerate.
    pub fn add_box(&mut self, a: (u32, u32), b: (u32, u32)) -> Option<BoxMarker> {
        let marker = BoxMarker::from_corners(a, b)?;
        self.history.push(Marker::Box(marker));
        Some(marker)
    }

    /// Removes and returns the most recently committed marker.
    pub fn undo_last(&mut self) -> Option<Marker> {
        self.history.pop()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Commit-ordered view over everything, oldest first.
    pub fn markers(&self) -> &[Marker] {
        &self.history
    }

    pub fn points(&self) -> Vec<PointMarker> {
        self.history
            .iter()
            .filter_map(|marker| match marker {
                Marker::Point(point) => Some(*point),
                Marker::Box(_) => None,
            })
            .collect()
    }

    pub fn boxes(&self) -> Vec<BoxMarker> {
        self.history
            .iter()
            .filter_map(|marker| match marker {
                Marker::Box(boxed) => Some(*boxed),
                Marker::Point(_) => None,
            })
            .collect()
    }

    pub fn counts(&self) -> (usize, usize) {
        let points = self
            .history
            .iter()
            .filter(|marker| marker.kind() == MarkerKind::Point)
            .count();
        (points, self.history.len() - points)
    }
}
