//! # Component: Typed Value Cells With a Closed Set of Kinds
//!
//! A component is a small value cell attached to an entity: a position, a
//! velocity, a name. Every cell remembers the value it was created with so it
//! can be reset, and the value it held before the last write so systems can
//! reason about "last frame".
//!
//! ## Kinds, not types
//!
//! The rule engine needs to *name* components in plain data (an action says
//! "SCALE the XVelocity by 2"), so component identity is a closed
//! [`ComponentKind`] enum rather than a Rust type. Each kind has exactly one
//! payload type:
//!
//! ```text
//! Number (f64)          XPosition, YPosition, Width, Health, Score, ...
//! Flag (bool)           Collision, Camera, PlayAudio, Progression, Pizza
//! Text (String)         Name, Group, Sprite, Audio
//! Contacts (Vec<..>)    Top/Bottom/Left/Right/AnyCollided
//! ```
//!
//! Typed code goes through a [`Kind<T>`] handle from [`kinds`], so the payload
//! type is known at compile time: `entity.get(kinds::X_POSITION)` returns an
//! `Option<&Component<f64>>`. Rules store the untyped [`ComponentKind`] and
//! carry a dynamic [`Value`] operand, which is checked when the rule is built.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::error::SkaldError;

// ── Payload types ────────────────────────────────────────────────────────

/// The shape of data a component kind stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadType {
    Number,
    Flag,
    Text,
    Contacts,
}

// ── ComponentKind ────────────────────────────────────────────────────────

/// Every component kind the runtime knows about.
///
/// An [`Entity`](super::entity::Entity) holds at most one component per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Name,
    Group,
    Sprite,
    Audio,
    XPosition,
    YPosition,
    ZPosition,
    XVelocity,
    YVelocity,
    Width,
    Height,
    Health,
    Value,
    Score,
    Lives,
    NextLevel,
    Collision,
    Camera,
    PlayAudio,
    Progression,
    Pizza,
    TopCollided,
    BottomCollided,
    LeftCollided,
    RightCollided,
    AnyCollided,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 26] = [
        ComponentKind::Name,
        ComponentKind::Group,
        ComponentKind::Sprite,
        ComponentKind::Audio,
        ComponentKind::XPosition,
        ComponentKind::YPosition,
        ComponentKind::ZPosition,
        ComponentKind::XVelocity,
        ComponentKind::YVelocity,
        ComponentKind::Width,
        ComponentKind::Height,
        ComponentKind::Health,
        ComponentKind::Value,
        ComponentKind::Score,
        ComponentKind::Lives,
        ComponentKind::NextLevel,
        ComponentKind::Collision,
        ComponentKind::Camera,
        ComponentKind::PlayAudio,
        ComponentKind::Progression,
        ComponentKind::Pizza,
        ComponentKind::TopCollided,
        ComponentKind::BottomCollided,
        ComponentKind::LeftCollided,
        ComponentKind::RightCollided,
        ComponentKind::AnyCollided,
    ];

    /// The payload type this kind stores.
    pub const fn payload(self) -> PayloadType {
        use ComponentKind::*;
        match self {
            Name | Group | Sprite | Audio => PayloadType::Text,
            XPosition | YPosition | ZPosition | XVelocity | YVelocity | Width | Height
            | Health | Value | Score | Lives | NextLevel => PayloadType::Number,
            Collision | Camera | PlayAudio | Progression | Pizza => PayloadType::Flag,
            TopCollided | BottomCollided | LeftCollided | RightCollided | AnyCollided => {
                PayloadType::Contacts
            }
        }
    }

    /// Display name used by the authoring tools, e.g. `"XPositionComponent"`.
    pub const fn name(self) -> &'static str {
        use ComponentKind::*;
        match self {
            Name => "NameComponent",
            Group => "GroupComponent",
            Sprite => "SpriteComponent",
            Audio => "AudioComponent",
            XPosition => "XPositionComponent",
            YPosition => "YPositionComponent",
            ZPosition => "ZPositionComponent",
            XVelocity => "XVelocityComponent",
            YVelocity => "YVelocityComponent",
            Width => "WidthComponent",
            Height => "HeightComponent",
            Health => "HealthComponent",
            Value => "ValueComponent",
            Score => "ScoreComponent",
            Lives => "LivesComponent",
            NextLevel => "NextLevelComponent",
            Collision => "CollisionComponent",
            Camera => "CameraComponent",
            PlayAudio => "PlayAudioComponent",
            Progression => "ProgressionComponent",
            Pizza => "PizzaComponent",
            TopCollided => "TopCollidedComponent",
            BottomCollided => "BottomCollidedComponent",
            LeftCollided => "LeftCollidedComponent",
            RightCollided => "RightCollidedComponent",
            AnyCollided => "AnyCollidedComponent",
        }
    }

    /// Name without the `Component` suffix (`"XPosition"`).
    pub fn short_name(self) -> &'static str {
        let name = self.name();
        name.strip_suffix("Component").unwrap_or(name)
    }

    /// Returns `true` for the directional "collided" kinds.
    pub const fn is_collided(self) -> bool {
        matches!(self.payload(), PayloadType::Contacts)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentKind {
    type Err = SkaldError;

    /// Accepts either the full name (`"XPositionComponent"`) or the short one
    /// (`"XPosition"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s || k.short_name() == s)
            .ok_or_else(|| SkaldError::UnknownKind(s.to_string()))
    }
}

// ── Component<T> ─────────────────────────────────────────────────────────

/// A typed value cell with an immutable original value and a one-step history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component<T> {
    value: T,
    original: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous: Option<T>,
}

impl<T: Clone> Component<T> {
    pub fn new(value: T) -> Self {
        Self {
            original: value.clone(),
            value,
            previous: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// The value this component was created with. Never changes.
    pub fn original(&self) -> &T {
        &self.original
    }

    /// The value held before the most recent write, if any.
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Replace the value, remembering the old one as [`previous`](Self::previous).
    pub fn set_value(&mut self, value: T) {
        let old = std::mem::replace(&mut self.value, value);
        self.previous = Some(old);
    }

    /// Restore the original value.
    pub fn reset_to_original(&mut self) {
        let original = self.original.clone();
        self.set_value(original);
    }
}

impl Component<Vec<Contact>> {
    /// Append a contact without touching history. Contacts are per-tick data.
    pub fn push_contact(&mut self, contact: Contact) {
        self.value.push(contact);
    }

    /// Drop every recorded contact.
    pub fn clear_contacts(&mut self) {
        self.value.clear();
    }
}

// ── Contacts ─────────────────────────────────────────────────────────────

/// One entity touching another during the current tick.
///
/// The labels of the touching entity are captured when the contact is
/// recorded, so collided lists never point back into the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub entity: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Contact {
    /// Does this contact carry `label` as its name (or group, when `grouped`)?
    pub fn matches(&self, label: &str, grouped: bool) -> bool {
        let field = if grouped { &self.group } else { &self.name };
        field.as_deref() == Some(label)
    }
}

// ── Dynamic values ───────────────────────────────────────────────────────

/// A payload without a static type, used for rule operands and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Flag(bool),
    Text(String),
    Contacts(Vec<Contact>),
}

impl Value {
    pub fn payload(&self) -> PayloadType {
        match self {
            Value::Number(_) => PayloadType::Number,
            Value::Flag(_) => PayloadType::Flag,
            Value::Text(_) => PayloadType::Text,
            Value::Contacts(_) => PayloadType::Contacts,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The zero value for a payload type.
    pub fn default_for(payload: PayloadType) -> Self {
        match payload {
            PayloadType::Number => Value::Number(0.0),
            PayloadType::Flag => Value::Flag(false),
            PayloadType::Text => Value::Text(String::new()),
            PayloadType::Contacts => Value::Contacts(Vec::new()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Flag(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Contacts(c) => write!(f, "[{} contacts]", c.len()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Flag(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

// ── ComponentSlot ────────────────────────────────────────────────────────

/// A stored component: the tagged union of every `Component<T>` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentSlot {
    Number(Component<f64>),
    Flag(Component<bool>),
    Text(Component<String>),
    Contacts(Component<Vec<Contact>>),
}

impl ComponentSlot {
    /// Wrap a dynamic value in a fresh component.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Number(v) => ComponentSlot::Number(Component::new(v)),
            Value::Flag(v) => ComponentSlot::Flag(Component::new(v)),
            Value::Text(v) => ComponentSlot::Text(Component::new(v)),
            Value::Contacts(v) => ComponentSlot::Contacts(Component::new(v)),
        }
    }

    pub fn payload(&self) -> PayloadType {
        match self {
            ComponentSlot::Number(_) => PayloadType::Number,
            ComponentSlot::Flag(_) => PayloadType::Flag,
            ComponentSlot::Text(_) => PayloadType::Text,
            ComponentSlot::Contacts(_) => PayloadType::Contacts,
        }
    }

    /// Copy the current value out as a [`Value`].
    pub fn value(&self) -> Value {
        match self {
            ComponentSlot::Number(c) => Value::Number(*c.value()),
            ComponentSlot::Flag(c) => Value::Flag(*c.value()),
            ComponentSlot::Text(c) => Value::Text(c.value().clone()),
            ComponentSlot::Contacts(c) => Value::Contacts(c.value().clone()),
        }
    }

    /// Replace the value with a dynamic one of the same payload type.
    ///
    /// Returns the payload type that was expected if `value` doesn't match.
    pub(crate) fn set_dynamic(&mut self, value: Value) -> Result<(), PayloadType> {
        match (self, value) {
            (ComponentSlot::Number(c), Value::Number(v)) => c.set_value(v),
            (ComponentSlot::Flag(c), Value::Flag(v)) => c.set_value(v),
            (ComponentSlot::Text(c), Value::Text(v)) => c.set_value(v),
            (ComponentSlot::Contacts(c), Value::Contacts(v)) => c.set_value(v),
            (slot, _) => return Err(slot.payload()),
        }
        Ok(())
    }

    pub fn reset_to_original(&mut self) {
        match self {
            ComponentSlot::Number(c) => c.reset_to_original(),
            ComponentSlot::Flag(c) => c.reset_to_original(),
            ComponentSlot::Text(c) => c.reset_to_original(),
            ComponentSlot::Contacts(c) => c.reset_to_original(),
        }
    }
}

// ── Typed access ─────────────────────────────────────────────────────────

/// A Rust type that can be a component payload.
///
/// Implemented for `f64`, `bool`, `String`, and `Vec<Contact>`. Ties each
/// payload type to its [`ComponentSlot`] variant so typed lookups can
/// downcast without `Any`.
pub trait Payload: Clone + fmt::Debug + Sized + 'static {
    const TYPE: PayloadType;

    fn from_slot(slot: &ComponentSlot) -> Option<&Component<Self>>;
    fn from_slot_mut(slot: &mut ComponentSlot) -> Option<&mut Component<Self>>;
    fn into_slot(component: Component<Self>) -> ComponentSlot;
    fn into_value(self) -> Value;
}

macro_rules! impl_payload {
    ($ty:ty, $variant:ident) => {
        impl Payload for $ty {
            const TYPE: PayloadType = PayloadType::$variant;

            fn from_slot(slot: &ComponentSlot) -> Option<&Component<Self>> {
                match slot {
                    ComponentSlot::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn from_slot_mut(slot: &mut ComponentSlot) -> Option<&mut Component<Self>> {
                match slot {
                    ComponentSlot::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn into_slot(component: Component<Self>) -> ComponentSlot {
                ComponentSlot::$variant(component)
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_payload!(f64, Number);
impl_payload!(bool, Flag);
impl_payload!(String, Text);
impl_payload!(Vec<Contact>, Contacts);

/// A [`ComponentKind`] whose payload type is known at compile time.
///
/// Use the constants in [`kinds`] rather than building these yourself.
pub struct Kind<T> {
    kind: ComponentKind,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Kind<T> {
    const fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            _payload: PhantomData,
        }
    }

    pub const fn kind(self) -> ComponentKind {
        self.kind
    }
}

impl<T> Clone for Kind<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Kind<T> {}

impl<T> fmt::Debug for Kind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.kind.short_name())
    }
}

impl<T> From<Kind<T>> for ComponentKind {
    fn from(k: Kind<T>) -> Self {
        k.kind
    }
}

/// Typed handles for every [`ComponentKind`].
pub mod kinds {
    use super::{ComponentKind, Contact, Kind};

    pub const NAME: Kind<String> = Kind::new(ComponentKind::Name);
    pub const GROUP: Kind<String> = Kind::new(ComponentKind::Group);
    pub const SPRITE: Kind<String> = Kind::new(ComponentKind::Sprite);
    pub const AUDIO: Kind<String> = Kind::new(ComponentKind::Audio);

    pub const X_POSITION: Kind<f64> = Kind::new(ComponentKind::XPosition);
    pub const Y_POSITION: Kind<f64> = Kind::new(ComponentKind::YPosition);
    pub const Z_POSITION: Kind<f64> = Kind::new(ComponentKind::ZPosition);
    pub const X_VELOCITY: Kind<f64> = Kind::new(ComponentKind::XVelocity);
    pub const Y_VELOCITY: Kind<f64> = Kind::new(ComponentKind::YVelocity);
    pub const WIDTH: Kind<f64> = Kind::new(ComponentKind::Width);
    pub const HEIGHT: Kind<f64> = Kind::new(ComponentKind::Height);
    pub const HEALTH: Kind<f64> = Kind::new(ComponentKind::Health);
    pub const VALUE: Kind<f64> = Kind::new(ComponentKind::Value);
    pub const SCORE: Kind<f64> = Kind::new(ComponentKind::Score);
    pub const LIVES: Kind<f64> = Kind::new(ComponentKind::Lives);
    pub const NEXT_LEVEL: Kind<f64> = Kind::new(ComponentKind::NextLevel);

    pub const COLLISION: Kind<bool> = Kind::new(ComponentKind::Collision);
    pub const CAMERA: Kind<bool> = Kind::new(ComponentKind::Camera);
    pub const PLAY_AUDIO: Kind<bool> = Kind::new(ComponentKind::PlayAudio);
    pub const PROGRESSION: Kind<bool> = Kind::new(ComponentKind::Progression);
    pub const PIZZA: Kind<bool> = Kind::new(ComponentKind::Pizza);

    pub const TOP_COLLIDED: Kind<Vec<Contact>> = Kind::new(ComponentKind::TopCollided);
    pub const BOTTOM_COLLIDED: Kind<Vec<Contact>> = Kind::new(ComponentKind::BottomCollided);
    pub const LEFT_COLLIDED: Kind<Vec<Contact>> = Kind::new(ComponentKind::LeftCollided);
    pub const RIGHT_COLLIDED: Kind<Vec<Contact>> = Kind::new(ComponentKind::RightCollided);
    pub const ANY_COLLIDED: Kind<Vec<Contact>> = Kind::new(ComponentKind::AnyCollided);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of<T: Payload>(_: Kind<T>) -> PayloadType {
        T::TYPE
    }

    #[test]
    fn typed_handles_agree_with_kind_payloads() {
        let checks = [
            (payload_of(kinds::NAME), kinds::NAME.kind()),
            (payload_of(kinds::GROUP), kinds::GROUP.kind()),
            (payload_of(kinds::SPRITE), kinds::SPRITE.kind()),
            (payload_of(kinds::AUDIO), kinds::AUDIO.kind()),
            (payload_of(kinds::X_POSITION), kinds::X_POSITION.kind()),
            (payload_of(kinds::Y_POSITION), kinds::Y_POSITION.kind()),
            (payload_of(kinds::Z_POSITION), kinds::Z_POSITION.kind()),
            (payload_of(kinds::X_VELOCITY), kinds::X_VELOCITY.kind()),
            (payload_of(kinds::Y_VELOCITY), kinds::Y_VELOCITY.kind()),
            (payload_of(kinds::WIDTH), kinds::WIDTH.kind()),
            (payload_of(kinds::HEIGHT), kinds::HEIGHT.kind()),
            (payload_of(kinds::HEALTH), kinds::HEALTH.kind()),
            (payload_of(kinds::VALUE), kinds::VALUE.kind()),
            (payload_of(kinds::SCORE), kinds::SCORE.kind()),
            (payload_of(kinds::LIVES), kinds::LIVES.kind()),
            (payload_of(kinds::NEXT_LEVEL), kinds::NEXT_LEVEL.kind()),
            (payload_of(kinds::COLLISION), kinds::COLLISION.kind()),
            (payload_of(kinds::CAMERA), kinds::CAMERA.kind()),
            (payload_of(kinds::PLAY_AUDIO), kinds::PLAY_AUDIO.kind()),
            (payload_of(kinds::PROGRESSION), kinds::PROGRESSION.kind()),
            (payload_of(kinds::PIZZA), kinds::PIZZA.kind()),
            (payload_of(kinds::TOP_COLLIDED), kinds::TOP_COLLIDED.kind()),
            (payload_of(kinds::BOTTOM_COLLIDED), kinds::BOTTOM_COLLIDED.kind()),
            (payload_of(kinds::LEFT_COLLIDED), kinds::LEFT_COLLIDED.kind()),
            (payload_of(kinds::RIGHT_COLLIDED), kinds::RIGHT_COLLIDED.kind()),
            (payload_of(kinds::ANY_COLLIDED), kinds::ANY_COLLIDED.kind()),
        ];
        assert_eq!(checks.len(), ComponentKind::ALL.len());
        for (payload, kind) in checks {
            assert_eq!(payload, kind.payload(), "{kind}");
        }
    }

    #[test]
    fn original_survives_writes() {
        let mut c = Component::new(50.0);
        c.set_value(10.0);
        c.set_value(20.0);
        assert_eq!(*c.value(), 20.0);
        assert_eq!(*c.original(), 50.0);
        assert_eq!(c.previous(), Some(&10.0));

        c.reset_to_original();
        assert_eq!(*c.value(), 50.0);
        assert_eq!(c.previous(), Some(&20.0));
    }

    #[test]
    fn fresh_component_has_no_history() {
        let c = Component::new(String::from("mario"));
        assert!(c.previous().is_none());
    }

    #[test]
    fn kind_names_parse_both_ways() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.name().parse::<ComponentKind>().unwrap(), kind);
            assert_eq!(kind.short_name().parse::<ComponentKind>().unwrap(), kind);
        }
        assert!(matches!(
            "Bogus".parse::<ComponentKind>(),
            Err(SkaldError::UnknownKind(_))
        ));
    }

    #[test]
    fn set_dynamic_rejects_wrong_payload() {
        let mut slot = ComponentSlot::from_value(Value::Number(1.0));
        assert_eq!(slot.set_dynamic(Value::Flag(true)), Err(PayloadType::Number));
        assert_eq!(slot.set_dynamic(Value::Number(4.0)), Ok(()));
        assert_eq!(slot.value(), Value::Number(4.0));
    }

    #[test]
    fn contact_matching_respects_grouped_flag() {
        let contact = Contact {
            entity: EntityId::new(3, 0),
            name: Some("Block".into()),
            group: Some("Walls".into()),
        };
        assert!(contact.matches("Block", false));
        assert!(!contact.matches("Block", true));
        assert!(contact.matches("Walls", true));
        assert!(!contact.matches("block", false));
    }

    #[test]
    fn untagged_values_read_naturally_from_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[1.5, true, "hi"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Number(1.5), Value::Flag(true), Value::Text("hi".into())]
        );
    }
}
