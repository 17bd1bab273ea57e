pub mod angle;
pub mod camera;
pub mod collision;
pub mod constants;
pub mod error;
pub mod four_d;
pub mod frame;
pub mod physics;
pub mod player;
pub mod scene;
pub mod settings;

pub use angle::{angular_distance, angular_distance01, canonicalize, roughly_equal};
pub use camera::{CameraRig, ControlEvent, FpsCamera, ListenerId};
pub use collision::{
    Capsule, Octree, OctreeBuilder, Penetration, Ray, RayHit, Sphere, StaticCollider, Triangle,
    TriangleBvh,
};
pub use error::{SceneError, SettingsError};
pub use four_d::{W4dTable, W4dTag, alpha_from_distance};
pub use frame::substeps;
pub use physics::Simulation;
pub use player::{InputState, PlayerState};
pub use scene::{EntityId, MeshGeometry, SceneGraph, SceneTree};
pub use settings::ControllerSettings;
