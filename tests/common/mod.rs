#![allow(dead_code)]

use std::collections::HashMap;

use rust_overlapping_pairs::{
    BodyComponents, BodyType, CollisionShapeType, DefaultCollisionDispatch, Entity, PairContext,
    ProxyShapeComponents,
};

pub struct ProxyShape {
    pub body: Entity,
    pub broad_phase_id: i32,
    pub shape_type: CollisionShapeType,
}

pub struct Body {
    pub is_disabled: bool,
    pub body_type: Option<BodyType>,
}

#[derive(Default)]
pub struct ProxyShapeTable(pub HashMap<Entity, ProxyShape>);

impl ProxyShapeComponents for ProxyShapeTable {
    fn body(&self, proxy_shape: Entity) -> Entity {
        self.0[&proxy_shape].body
    }

    fn broad_phase_id(&self, proxy_shape: Entity) -> i32 {
        self.0[&proxy_shape].broad_phase_id
    }

    fn shape_type(&self, proxy_shape: Entity) -> CollisionShapeType {
        self.0[&proxy_shape].shape_type
    }
}

#[derive(Default)]
pub struct BodyTable(pub HashMap<Entity, Body>);

impl BodyComponents for BodyTable {
    fn is_disabled(&self, body: Entity) -> bool {
        self.0[&body].is_disabled
    }

    fn body_type(&self, body: Entity) -> Option<BodyType> {
        self.0[&body].body_type
    }
}

/// Bodies and proxy shapes the registry reads from.
pub struct TestWorld {
    pub proxy_shapes: ProxyShapeTable,
    pub bodies: BodyTable,
    pub dispatch: DefaultCollisionDispatch,
    next_entity: u32,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            proxy_shapes: ProxyShapeTable::default(),
            bodies: BodyTable::default(),
            dispatch: DefaultCollisionDispatch::new(),
            next_entity: 0,
        }
    }

    pub fn add_body(&mut self, body_type: Option<BodyType>) -> Entity {
        let body = Entity(self.next_entity);
        self.next_entity += 1;
        self.bodies.0.insert(
            body,
            Body {
                is_disabled: false,
                body_type,
            },
        );
        body
    }

    pub fn add_shape(&mut self, body: Entity, shape_type: CollisionShapeType) -> Entity {
        let shape = Entity(self.next_entity);
        self.next_entity += 1;
        self.proxy_shapes.0.insert(
            shape,
            ProxyShape {
                body,
                broad_phase_id: 1000 + shape.0 as i32,
                shape_type,
            },
        );
        shape
    }

    /// Adds a dynamic body holding a single shape and returns the shape.
    pub fn add_dynamic_shape(&mut self, shape_type: CollisionShapeType) -> Entity {
        let body = self.add_body(Some(BodyType::Dynamic));
        self.add_shape(body, shape_type)
    }

    pub fn body_of(&self, shape: Entity) -> Entity {
        self.proxy_shapes.0[&shape].body
    }

    pub fn set_disabled(&mut self, body: Entity, is_disabled: bool) {
        if let Some(entry) = self.bodies.0.get_mut(&body) {
            entry.is_disabled = is_disabled;
        }
    }

    pub fn set_shape_type(&mut self, shape: Entity, shape_type: CollisionShapeType) {
        if let Some(entry) = self.proxy_shapes.0.get_mut(&shape) {
            entry.shape_type = shape_type;
        }
    }

    pub fn ctx(&self) -> PairContext<'_> {
        PairContext {
            proxy_shapes: &self.proxy_shapes,
            bodies: &self.bodies,
            collision_dispatch: &self.dispatch,
        }
    }
}
