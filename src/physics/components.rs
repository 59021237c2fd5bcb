use crate::physics::handles::Entity;

/// Broad classification of a collision shape used to pick a narrow phase algorithm.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionShapeType {
    Sphere = 0,
    Capsule = 1,
    ConvexPolyhedron = 2,
    /// Shapes made of many sub-shapes, such as triangle meshes and height fields.
    ConcaveShape = 3,
}

impl CollisionShapeType {
    /// Gets whether shapes of this type are convex.
    #[inline(always)]
    pub fn is_convex(&self) -> bool {
        *self != CollisionShapeType::ConcaveShape
    }
}

/// Represents how a body can interact and move.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Body that never moves.
    Static = 0,
    /// Body moved by the user with an infinite mass.
    Kinematic = 1,
    /// Body moved by the simulation.
    Dynamic = 2,
}

/// Read access to the proxy shape components.
pub trait ProxyShapeComponents {
    /// Gets the body owning the proxy shape.
    fn body(&self, proxy_shape: Entity) -> Entity;

    /// Gets the id of the proxy shape inside the broad phase.
    fn broad_phase_id(&self, proxy_shape: Entity) -> i32;

    /// Gets the type of the collision shape attached to the proxy shape.
    fn shape_type(&self, proxy_shape: Entity) -> CollisionShapeType;
}

/// Read access to the body components.
pub trait BodyComponents {
    /// Gets whether the body is disabled. Sleeping bodies are disabled.
    fn is_disabled(&self, body: Entity) -> bool;

    /// Gets the type of the rigid body, or `None` for plain collision bodies which are not
    /// part of the dynamics.
    fn body_type(&self, body: Entity) -> Option<BodyType>;

    /// Gets whether the body is awake and can move.
    #[inline(always)]
    fn is_active(&self, body: Entity) -> bool {
        !self.is_disabled(body) && self.body_type(body) != Some(BodyType::Static)
    }
}
