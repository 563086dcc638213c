//! Polymorphic world-object (VOb) record hierarchy serialized through the
//! archive subsystem.
//!
//! [`registry::build_registry`] maps archive class names to the
//! representative [`Vob`] variants this crate knows how to parse;
//! [`registry::read_root_vob`] walks one VOb and its `childs0` subtree from
//! any [`zen_archive::ArchiveReader`].

pub mod base;
pub mod camera;
pub mod container;
pub mod error;
pub mod light;
pub mod npc;
pub mod registry;
pub mod sound;
pub mod trigger;
pub mod visual;

pub use base::{AnimationType, OpaqueRef, RigidBody, ShadowType, SpriteAlignment, VirtualObjectBase};
pub use camera::{Camera, CameraLerpType, CameraLoopMode, CameraTrajectoryFrame};
pub use container::Container;
pub use error::{Error, Result};
pub use light::{Light, LightColorKey};
pub use npc::{AiStateRef, InventorySlot, Item, Npc, Talent};
pub use registry::{build_registry, read_root_vob, read_vob_tree, write_vob_tree, Vob, VobNode, VobTag};
pub use sound::{Sound, SoundMode, SoundVolumeType};
pub use trigger::{Mover, MoverBehavior, MoverKeyframe, MoverLerpMode, MoverSpeedType, Trigger};
pub use visual::{Visual, VisualDecal, VisualType};
