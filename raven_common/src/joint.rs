//! Joint identity and homing-state enums.
//!
//! All enums use `#[repr(u8)]` so they can be mirrored into telemetry
//! frames as raw bytes. `DofType` is the raw per-device type index that
//! keys the per-type constant tables.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_DOF, MAX_DOF_PER_MECH};

// ─── Arm Identity ───────────────────────────────────────────────────

/// Arm identity. The two arms are mirror images, so encoder sign
/// conventions differ between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ArmId {
    Gold = 0,
    Green = 1,
}

impl ArmId {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Gold),
            1 => Some(Self::Green),
            _ => None,
        }
    }
}

// ─── Joint Kind ─────────────────────────────────────────────────────

/// Joint slot within a mechanism.
///
/// The discriminant is the slot index; the layout is identical on every
/// mechanism. Slot 3 is an unconnected amplifier channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JointKind {
    Shoulder = 0,
    Elbow = 1,
    Insertion = 2,
    Unused = 3,
    ToolRotation = 4,
    Wrist = 5,
    Grasp1 = 6,
    Grasp2 = 7,
}

impl JointKind {
    /// All slots in mechanism order.
    pub const ALL: [JointKind; MAX_DOF_PER_MECH] = [
        Self::Shoulder,
        Self::Elbow,
        Self::Insertion,
        Self::Unused,
        Self::ToolRotation,
        Self::Wrist,
        Self::Grasp1,
        Self::Grasp2,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Shoulder),
            1 => Some(Self::Elbow),
            2 => Some(Self::Insertion),
            3 => Some(Self::Unused),
            4 => Some(Self::ToolRotation),
            5 => Some(Self::Wrist),
            6 => Some(Self::Grasp1),
            7 => Some(Self::Grasp2),
            _ => None,
        }
    }

    /// Slot index within the mechanism.
    #[inline]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Tool joints: tool rotation, wrist and both graspers.
    #[inline]
    pub const fn is_tool(self) -> bool {
        matches!(
            self,
            Self::ToolRotation | Self::Wrist | Self::Grasp1 | Self::Grasp2
        )
    }

    /// Positioning joints: shoulder, elbow, insertion.
    #[inline]
    pub const fn is_positioning(self) -> bool {
        matches!(self, Self::Shoulder | Self::Elbow | Self::Insertion)
    }
}

// ─── Completion Groups ──────────────────────────────────────────────

/// The two independently gated homing groups of a mechanism.
///
/// Tools are homed first; positioning joints start only once the tool
/// group is `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompletionGroup {
    Tool = 0,
    Positioning = 1,
}

impl CompletionGroup {
    /// Joints whose states decide completion of this group.
    ///
    /// Grasper 2 follows grasper 1 mechanically and is not part of the
    /// tool barrier.
    #[inline]
    pub const fn members(self) -> [JointKind; 3] {
        match self {
            Self::Tool => [JointKind::ToolRotation, JointKind::Wrist, JointKind::Grasp1],
            Self::Positioning => [JointKind::Shoulder, JointKind::Elbow, JointKind::Insertion],
        }
    }
}

// ─── DOF Type Index ─────────────────────────────────────────────────

/// Raw per-device joint type index: `mechanism * MAX_DOF_PER_MECH + slot`.
///
/// Keys the 16-entry DOF type table directly; shared 8-entry tables are
/// keyed by [`DofType::slot`]. Values are not range-checked on
/// construction so that a malformed index surfaces as a homing error
/// instead of a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DofType(u8);

impl DofType {
    /// Build the type index for `kind` on mechanism `mechanism`.
    #[inline]
    pub const fn new(mechanism: usize, kind: JointKind) -> Self {
        Self((mechanism * MAX_DOF_PER_MECH + kind.slot()) as u8)
    }

    #[inline]
    pub const fn from_raw(index: u8) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Index into shared per-slot tables.
    #[inline]
    pub const fn slot(self) -> usize {
        self.0 as usize % MAX_DOF_PER_MECH
    }

    /// Mechanism this type belongs to.
    #[inline]
    pub const fn mechanism(self) -> usize {
        self.0 as usize / MAX_DOF_PER_MECH
    }

    #[inline]
    pub const fn kind(self) -> JointKind {
        match JointKind::from_u8(self.slot() as u8) {
            Some(kind) => kind,
            // slot() < MAX_DOF_PER_MECH == 8
            None => JointKind::Unused,
        }
    }

    /// True when the index addresses an entry of the DOF type table.
    #[inline]
    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < MAX_DOF
    }
}

// ─── Joint Homing State ─────────────────────────────────────────────

/// Per-joint homing state.
///
/// ```text
/// NotReady → PosUnknown → HardStop → Homing1 → Homing2 → Ready
/// ```
/// `Wait` is a passive state never advanced by the homing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JointState {
    NotReady = 0,
    PosUnknown = 1,
    Homing1 = 2,
    Homing2 = 3,
    Ready = 4,
    Wait = 5,
    HardStop = 6,
}

impl JointState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotReady),
            1 => Some(Self::PosUnknown),
            2 => Some(Self::Homing1),
            3 => Some(Self::Homing2),
            4 => Some(Self::Ready),
            5 => Some(Self::Wait),
            6 => Some(Self::HardStop),
            _ => None,
        }
    }
}

impl Default for JointState {
    fn default() -> Self {
        Self::NotReady
    }
}
