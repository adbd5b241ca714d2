#![allow(dead_code)]

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata::config::ResourceConfig;
use strata::ecs::{Behaviour, Component, Disposable, Entity, System, World};
use strata::resource::{ImportSettings, Resource, ResourceMeta};
use strata::{CoreResult, Host, ResourceOptions, Runtime, RuntimeConfig, Uuid};

/// Behaviour that records every hook call in order.
#[derive(Default)]
pub struct Probe {
    pub enabled: bool,
    pub events: Vec<&'static str>,
}

impl Probe {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }
}

impl Component for Probe {
    fn as_behaviour(&mut self) -> Option<&mut dyn Behaviour> {
        Some(self)
    }

    fn as_disposable(&mut self) -> Option<&mut dyn Disposable> {
        Some(self)
    }
}

impl Behaviour for Probe {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn start(&mut self, _entity: &Entity) {
        self.events.push("start");
    }

    fn destroyed(&mut self, _entity: &Entity) {
        self.events.push("destroyed");
    }
}

impl Disposable for Probe {
    fn dispose(&mut self) {
        self.events.push("dispose");
    }
}

/// Plain data component.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub points: i32,
}

impl Component for Health {
    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn on_deserialize(&mut self, data: &Value, _entity: &Entity) -> CoreResult<()> {
        *self = serde_json::from_value(data.clone())?;
        Ok(())
    }
}

/// Holds a reference to another entity, saved as its raw ID.
#[derive(Default)]
pub struct Follower {
    pub target: Option<Entity>,
}

impl Component for Follower {
    fn on_serialize(&self) -> CoreResult<Value> {
        let target = self.target.as_ref().map(Entity::id).unwrap_or(Uuid::INVALID);
        Ok(serde_json::json!({ "target": target }))
    }

    fn on_deserialize(&mut self, data: &Value, entity: &Entity) -> CoreResult<()> {
        let target: Uuid = serde_json::from_value(data["target"].clone())?;
        self.target = entity.world().and_then(|world| world.entity(target));
        Ok(())
    }
}

/// Behaviour that looks up a sibling component from its start hook.
#[derive(Default)]
pub struct Curious {
    pub enabled: bool,
    pub saw_health: Option<i32>,
}

impl Component for Curious {
    fn as_behaviour(&mut self) -> Option<&mut dyn Behaviour> {
        Some(self)
    }
}

impl Behaviour for Curious {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn start(&mut self, entity: &Entity) {
        self.saw_health = entity
            .get_component::<Health>()
            .map(|health| health.borrow().points);
    }

    fn destroyed(&mut self, _entity: &Entity) {}
}

#[derive(Default)]
pub struct Ticker {
    pub ticks: u32,
    pub toggles: Vec<bool>,
}

impl System for Ticker {
    fn on_enable(&mut self, enabled: bool) {
        self.toggles.push(enabled);
    }

    fn update(&mut self, _world: &World, _dt: f64) {
        self.ticks += 1;
    }

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(serde_json::json!({ "ticks": self.ticks }))
    }

    fn on_deserialize(&mut self, data: &Value, _world: &World) -> CoreResult<()> {
        self.ticks = data["ticks"].as_u64().unwrap_or_default() as u32;
        Ok(())
    }
}

/// System that records its enable transitions; reporters append to it too,
/// so one log shows how behaviour and system callbacks interleave.
#[derive(Default)]
pub struct Journal {
    pub entries: Vec<&'static str>,
}

impl System for Journal {
    fn on_enable(&mut self, enabled: bool) {
        self.entries.push(if enabled { "enable" } else { "disable" });
    }
}

/// Behaviour that writes its hooks into the world's [`Journal`].
#[derive(Default)]
pub struct Reporter {
    pub enabled: bool,
    pub attached_when_destroyed: Option<bool>,
}

impl Reporter {
    fn record(entity: &Entity, event: &'static str) {
        if let Some(journal) = entity.world().and_then(|world| world.get_system::<Journal>()) {
            journal.borrow_mut().entries.push(event);
        }
    }
}

impl Component for Reporter {
    fn as_behaviour(&mut self) -> Option<&mut dyn Behaviour> {
        Some(self)
    }
}

impl Behaviour for Reporter {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn start(&mut self, entity: &Entity) {
        Self::record(entity, "start");
    }

    fn destroyed(&mut self, entity: &Entity) {
        self.attached_when_destroyed = Some(entity.has_component::<Reporter>());
        Self::record(entity, "destroyed");
    }
}

/// Disk-cached text resource.
#[derive(Default)]
pub struct Note {
    pub meta: ResourceMeta,
    pub text: String,
    pub loads: u32,
    pub imports: u32,
}

impl Resource for Note {
    fn create(_host: &Host) -> Self {
        Note::default()
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn on_load(&mut self) {
        self.loads += 1;
    }

    fn on_import(&mut self, settings: &ImportSettings) {
        self.imports += 1;
        if let Some(text) = settings["text"].as_str() {
            self.text = text.to_string();
        }
    }

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(serde_json::json!({ "text": self.text }))
    }

    fn on_deserialize(&mut self, data: &Value) -> CoreResult<()> {
        self.text = data["text"].as_str().unwrap_or_default().to_string();
        Ok(())
    }
}

/// Manifest-listed resource without a sidecar.
#[derive(Default)]
pub struct Tag {
    pub meta: ResourceMeta,
}

impl Resource for Tag {
    fn create(_host: &Host) -> Self {
        Tag::default()
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

pub fn runtime(root: &Path) -> Runtime {
    let config = RuntimeConfig {
        resources: ResourceConfig::rooted_at(root),
        ..RuntimeConfig::default()
    };
    Runtime::builder(config)
        .with_component::<Probe>("Probe")
        .with_component::<Health>("Health")
        .with_component::<Follower>("Follower")
        .with_component::<Curious>("Curious")
        .with_component::<Reporter>("Reporter")
        .with_system::<Ticker>("Ticker")
        .with_system::<Journal>("Journal")
        .with_resource::<Note>("Note", ResourceOptions::cached())
        .with_resource::<Tag>("Tag", ResourceOptions::default())
        .build()
}

pub fn text(value: &str) -> Value {
    serde_json::json!({ "text": value })
}
