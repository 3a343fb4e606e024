//! The DOM capability the protocol drives.
//!
//! This crate never touches a document itself. The embedding application implements
//! [`Renderer`] (over `web-sys`, a headless DOM, a test double) and every built-in verb
//! becomes exactly one call on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Where [`Renderer::insert_adjacent`] places new markup, as in `insertAdjacentHTML`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Position {
    /// Before the element itself (`before`)
    BeforeBegin,
    /// Inside the element, before its first child (`prepend`)
    AfterBegin,
    /// Inside the element, after its last child (`append`)
    BeforeEnd,
    /// After the element itself (`after`)
    AfterEnd,
}

/// `animation-play-state`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayState {
    Running,
    Paused,
}

/// CSS animation to start on an element (`animate` verb).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    /// `animation-name`
    pub name: String,
    /// `animation-duration`, e.g. `300ms`
    pub duration: String,
    /// `animation-timing-function`
    pub timing_function: String,
    /// `animation-iteration-count`, e.g. `1` or `infinite`
    pub iteration_count: String,
}

/// CSS transition of one property to a new value (`transition` verb).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Property being transitioned, e.g. `opacity`
    pub property: String,
    /// Value the property transitions to
    pub value: String,
    /// `transition-duration`
    pub duration: String,
    /// `transition-timing-function`
    pub timing_function: String,
}

/// Snapshot reported by `getAnimationState`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationState {
    /// Running animation, if any
    pub animation_name: Option<String>,
    /// Current play state, if an animation is attached
    pub play_state: Option<PlayState>,
}

impl AnimationState {
    #[must_use]
    pub fn new(animation_name: Option<String>, play_state: Option<PlayState>) -> Self {
        Self {
            animation_name,
            play_state,
        }
    }

    #[must_use]
    pub fn idle() -> Self {
        Self::new(None, None)
    }
}

/// Keyframe stops of one `@keyframes` rule: offset (`from`, `50%`, `to`) to declarations.
///
/// ```
/// use ws_hypermedia::render::Keyframes;
///
/// let keyframes: Keyframes =
///     serde_json::from_str(r#"{"from":{"opacity":"0"},"to":{"opacity":"1"}}"#).unwrap();
///
/// assert_eq!(keyframes.stops()["to"]["opacity"], "1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyframes(BTreeMap<String, BTreeMap<String, String>>);

impl Keyframes {
    #[must_use]
    pub fn stops(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, BTreeMap<String, String>>> for Keyframes {
    fn from(stops: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self(stops)
    }
}

/// Host DOM operations.
///
/// Implementations are shared between the connection task and detached handler tasks,
/// hence `Send + Sync`. Methods take `&self`; interior mutability is the implementor's
/// business. Failing primitives return an error built with
/// [`Error::render`](crate::error::Error::render); the dispatcher logs it and moves on.
pub trait Renderer: Send + Sync + 'static {
    /// Handle to one element.
    type Element: Clone + Send + Sync + 'static;

    /// Look up an element by id. `None` skips the frame.
    fn resolve_element(&self, id: &str) -> Option<Self::Element>;

    fn set_inner_html(&self, element: &Self::Element, html: &str) -> Result<()>;

    fn set_outer_html(&self, element: &Self::Element, html: &str) -> Result<()>;

    fn insert_adjacent(&self, element: &Self::Element, position: Position, html: &str)
    -> Result<()>;

    fn remove_element(&self, element: &Self::Element) -> Result<()>;

    /// Add each class; classes already present are left alone.
    fn add_classes(&self, element: &Self::Element, names: &[&str]) -> Result<()>;

    /// Remove each class; absent classes are ignored.
    fn remove_classes(&self, element: &Self::Element, names: &[&str]) -> Result<()>;

    fn toggle_classes(&self, element: &Self::Element, names: &[&str]) -> Result<()>;

    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&self, element: &Self::Element, name: &str) -> Result<()>;

    /// Set one style property. Custom properties (`--accent`) are passed through as they are.
    fn set_style_property(&self, element: &Self::Element, name: &str, value: &str)
    -> Result<()>;

    fn remove_style_property(&self, element: &Self::Element, name: &str) -> Result<()>;

    /// Fire a DOM event. `data` holds fields to copy onto the event object; it never
    /// contains `__proto__` or `constructor`.
    fn dispatch_event(
        &self,
        element: &Self::Element,
        event_type: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<()>;

    fn set_form_value(&self, element: &Self::Element, value: &str) -> Result<()>;

    fn set_checked(&self, element: &Self::Element, checked: bool) -> Result<()>;

    /// Select exactly `values` in a (multi-)select.
    fn set_selected(&self, element: &Self::Element, values: &[&str]) -> Result<()>;

    fn set_animation(&self, element: &Self::Element, animation: &Animation) -> Result<()>;

    fn set_transition(&self, element: &Self::Element, transition: &Transition) -> Result<()>;

    fn remove_animation(&self, element: &Self::Element) -> Result<()>;

    fn set_animation_play_state(&self, element: &Self::Element, state: PlayState) -> Result<()>;

    fn animation_state(&self, element: &Self::Element) -> Result<AnimationState>;

    /// Register an `@keyframes` rule named `name`.
    fn define_keyframes(&self, element: &Self::Element, name: &str, keyframes: &Keyframes)
    -> Result<()>;
}
