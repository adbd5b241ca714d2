use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Component, Entity};
use crate::error::CoreResult;
use crate::id::Uuid;

/// Spatial placement and hierarchy links of an entity.
///
/// `parent` and `children` hold raw entity IDs. They stay valid across a
/// save/load because worlds restore entities under their original IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub parent: Option<Uuid>,
    pub children: Vec<Uuid>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            parent: None,
            children: Vec::new(),
        }
    }
}

impl Transform {
    pub fn at(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub(crate) fn attach_child(&mut self, child: Uuid) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn detach_child(&mut self, child: Uuid) {
        self.children.retain(|id| *id != child);
    }
}

impl Component for Transform {
    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn on_deserialize(&mut self, data: &Value, _entity: &Entity) -> CoreResult<()> {
        *self = Transform::deserialize(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scale_is_one() {
        let transform = Transform::default();
        assert_eq!(transform.scale, [1.0, 1.0, 1.0]);
        assert!(transform.parent.is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let transform: Transform =
            serde_json::from_value(serde_json::json!({ "translation": [1.0, 2.0, 3.0], "parent": "7" }))
                .unwrap();
        assert_eq!(transform.translation, [1.0, 2.0, 3.0]);
        assert_eq!(transform.scale, [1.0; 3]);
        assert_eq!(transform.parent, Some(Uuid::new(7)));
    }

    #[test]
    fn children_are_unique() {
        let mut transform = Transform::at([0.0, 1.0, 0.0]);
        transform.attach_child(Uuid::new(3));
        transform.attach_child(Uuid::new(3));
        transform.attach_child(Uuid::new(4));
        transform.detach_child(Uuid::new(3));
        assert_eq!(transform.children, vec![Uuid::new(4)]);
    }
}
