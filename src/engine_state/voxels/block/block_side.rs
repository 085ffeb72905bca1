//! # Block Side Module
//!
//! Axes, axis directions and the six faces of a voxel. The numeric value of a
//! [`BlockSide`] is the face-normal code written into mesh normal buffers and
//! decoded by the vertex shader.

/// One of the three coordinate axes.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Axis {
    /// The X axis.
    X = 0,
    /// The Y axis.
    Y = 1,
    /// The Z axis.
    Z = 2,
}

impl Axis {
    /// All axes in meshing order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index of this axis into an `[x, y, z]` triple.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Unit vector along this axis as an `[x, y, z]` triple.
    pub const fn unit(self) -> [i32; 3] {
        match self {
            Axis::X => [1, 0, 0],
            Axis::Y => [0, 1, 0],
            Axis::Z => [0, 0, 1],
        }
    }

    /// The two axes spanning the plane perpendicular to this one, as the
    /// `(b, c)` coordinate indices used by per-axis block masks.
    ///
    /// X planes are addressed by `(y, z)`, Y planes by `(x, z)` and Z planes by `(x, y)`.
    pub const fn plane_axes(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (0, 2),
            Axis::Z => (0, 1),
        }
    }

    /// Builds an `[x, y, z]` triple from a position `a` along this axis and the
    /// plane coordinates `(b, c)`.
    pub const fn compose(self, a: usize, b: usize, c: usize) -> [usize; 3] {
        match self {
            Axis::X => [a, b, c],
            Axis::Y => [b, a, c],
            Axis::Z => [b, c, a],
        }
    }
}

/// Direction along an axis.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Side {
    /// Towards smaller coordinates.
    Negative,
    /// Towards larger coordinates.
    Positive,
}

impl Side {
    /// Both sides, positive first (the order faces are emitted in).
    pub const ALL: [Side; 2] = [Side::Positive, Side::Negative];

    /// `-1` or `+1`.
    pub const fn sign(self) -> i32 {
        match self {
            Side::Negative => -1,
            Side::Positive => 1,
        }
    }
}

/// Represents the six possible faces of a voxel block.
///
/// The discriminant is the face-normal code: negative faces are `0..3`
/// (indexed by axis), positive faces are `3..6`.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The left face (facing negative X)
    LEFT = 0,

    /// The bottom face (facing negative Y)
    BOTTOM = 1,

    /// The back face (facing negative Z)
    BACK = 2,

    /// The right face (facing positive X)
    RIGHT = 3,

    /// The top face (facing positive Y)
    TOP = 4,

    /// The front face (facing positive Z)
    FRONT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in normal-code order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::BOTTOM,
            BlockSide::BACK,
            BlockSide::RIGHT,
            BlockSide::TOP,
            BlockSide::FRONT,
        ]
    }

    /// The face pointing along `side` of `axis`.
    pub const fn from_axis(axis: Axis, side: Side) -> Self {
        match (axis, side) {
            (Axis::X, Side::Negative) => BlockSide::LEFT,
            (Axis::Y, Side::Negative) => BlockSide::BOTTOM,
            (Axis::Z, Side::Negative) => BlockSide::BACK,
            (Axis::X, Side::Positive) => BlockSide::RIGHT,
            (Axis::Y, Side::Positive) => BlockSide::TOP,
            (Axis::Z, Side::Positive) => BlockSide::FRONT,
        }
    }

    /// The axis this face is perpendicular to.
    pub const fn axis(self) -> Axis {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => Axis::X,
            BlockSide::BOTTOM | BlockSide::TOP => Axis::Y,
            BlockSide::BACK | BlockSide::FRONT => Axis::Z,
        }
    }

    /// Which way along its axis this face points.
    pub const fn side(self) -> Side {
        match self {
            BlockSide::LEFT | BlockSide::BOTTOM | BlockSide::BACK => Side::Negative,
            BlockSide::RIGHT | BlockSide::TOP | BlockSide::FRONT => Side::Positive,
        }
    }

    /// The face-normal code stored per vertex.
    pub const fn normal_code(self) -> u32 {
        self as u32
    }

    /// Decodes a face-normal code.
    pub fn from_normal_code(code: u32) -> Option<Self> {
        Self::all().get(code as usize).copied()
    }

    /// Outward unit normal as an `[x, y, z]` triple.
    pub const fn normal(self) -> [i32; 3] {
        let unit = self.axis().unit();
        let sign = self.side().sign();
        [unit[0] * sign, unit[1] * sign, unit[2] * sign]
    }
}
