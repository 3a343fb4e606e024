#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Deeply nested uses in sub-modules are falsely flagged as being unused"
)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use ws_hypermedia::Result;
use ws_hypermedia::actions::Verb;
use ws_hypermedia::config::Config;
use ws_hypermedia::engine::{Dispatch, Engine};
use ws_hypermedia::error::Error;
use ws_hypermedia::protocol::ParsedMessage;
use ws_hypermedia::render::{
    Animation, AnimationState, Keyframes, PlayState, Position, Renderer, Transition,
};

/// One renderer primitive as it was called.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    InnerHtml(String, String),
    OuterHtml(String, String),
    Insert(String, Position, String),
    Remove(String),
    AddClasses(String, Vec<String>),
    RemoveClasses(String, Vec<String>),
    ToggleClasses(String, Vec<String>),
    SetAttribute(String, String, String),
    RemoveAttribute(String, String),
    SetStyle(String, String, String),
    RemoveStyle(String, String),
    Event(String, String, Option<Map<String, Value>>),
    FormValue(String, String),
    Checked(String, bool),
    Selected(String, Vec<String>),
    Animation(String, Animation),
    Transition(String, Transition),
    RemoveAnimation(String),
    PlayState(String, PlayState),
    Keyframes(String, String, Keyframes),
}

/// Observable state of one element.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub html: String,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    pub value: String,
    pub checked: bool,
    pub selected: Vec<String>,
    pub animation: Option<String>,
    pub play_state: Option<PlayState>,
}

#[derive(Debug, Default)]
struct Document {
    elements: HashMap<String, Element>,
    calls: Vec<Call>,
}

/// In-memory document with set semantics for classes. Elements are addressed by id.
#[derive(Debug, Default)]
pub struct TestDom {
    document: Mutex<Document>,
    /// Ids whose primitives fail with a render error
    failing: Mutex<BTreeSet<String>>,
    /// Ids whose primitives panic
    panicking: Mutex<BTreeSet<String>>,
}

impl TestDom {
    #[must_use]
    pub fn with_elements(ids: &[&str]) -> Self {
        let dom = Self::default();
        for id in ids {
            dom.insert(id);
        }
        dom
    }

    pub fn insert(&self, id: &str) {
        self.doc()
            .elements
            .insert(id.to_owned(), Element::default());
    }

    /// Make every primitive on `id` fail.
    pub fn fail_on(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_owned());
    }

    /// Make every primitive on `id` panic.
    pub fn panic_on(&self, id: &str) {
        self.panicking.lock().unwrap().insert(id.to_owned());
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<Element> {
        self.doc().elements.get(id).cloned()
    }

    #[must_use]
    pub fn html(&self, id: &str) -> String {
        self.element(id).map(|e| e.html).unwrap_or_default()
    }

    #[must_use]
    pub fn classes(&self, id: &str) -> Vec<String> {
        self.element(id)
            .map(|e| e.classes.into_iter().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.doc().calls.clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<(String, String, Option<Map<String, Value>>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Event(id, event, data) => Some((id, event, data)),
                _ => None,
            })
            .collect()
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap()
    }

    fn apply<F>(&self, id: &str, call: Call, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Element),
    {
        if self.failing.lock().unwrap().contains(id) {
            return Err(Error::render(format!("{id} is read-only")));
        }
        let panics = self.panicking.lock().unwrap().contains(id);
        assert!(!panics, "renderer blew up on {id}");

        let mut doc = self.doc();
        doc.calls.push(call);
        let element = doc
            .elements
            .get_mut(id)
            .ok_or_else(|| Error::render(format!("{id} is detached")))?;
        mutate(element);
        Ok(())
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

impl Renderer for TestDom {
    type Element = String;

    fn resolve_element(&self, id: &str) -> Option<String> {
        self.doc().elements.contains_key(id).then(|| id.to_owned())
    }

    fn set_inner_html(&self, element: &String, html: &str) -> Result<()> {
        self.apply(element, Call::InnerHtml(element.clone(), html.to_owned()), |e| {
            e.html = html.to_owned();
        })
    }

    fn set_outer_html(&self, element: &String, html: &str) -> Result<()> {
        self.apply(element, Call::OuterHtml(element.clone(), html.to_owned()), |e| {
            *e = Element {
                html: html.to_owned(),
                ..Element::default()
            };
        })
    }

    fn insert_adjacent(&self, element: &String, position: Position, html: &str) -> Result<()> {
        let call = Call::Insert(element.clone(), position, html.to_owned());
        self.apply(element, call, |e| match position {
            Position::AfterBegin => e.html.insert_str(0, html),
            Position::BeforeEnd => e.html.push_str(html),
            _ => {}
        })
    }

    fn remove_element(&self, element: &String) -> Result<()> {
        self.apply(element, Call::Remove(element.clone()), |_| {})?;
        self.doc().elements.remove(element);
        Ok(())
    }

    fn add_classes(&self, element: &String, names: &[&str]) -> Result<()> {
        self.apply(element, Call::AddClasses(element.clone(), owned(names)), |e| {
            e.classes.extend(owned(names));
        })
    }

    fn remove_classes(&self, element: &String, names: &[&str]) -> Result<()> {
        self.apply(element, Call::RemoveClasses(element.clone(), owned(names)), |e| {
            for name in names {
                e.classes.remove(*name);
            }
        })
    }

    fn toggle_classes(&self, element: &String, names: &[&str]) -> Result<()> {
        self.apply(element, Call::ToggleClasses(element.clone(), owned(names)), |e| {
            for name in names {
                if !e.classes.remove(*name) {
                    e.classes.insert((*name).to_owned());
                }
            }
        })
    }

    fn set_attribute(&self, element: &String, name: &str, value: &str) -> Result<()> {
        let call = Call::SetAttribute(element.clone(), name.to_owned(), value.to_owned());
        self.apply(element, call, |e| {
            e.attributes.insert(name.to_owned(), value.to_owned());
        })
    }

    fn remove_attribute(&self, element: &String, name: &str) -> Result<()> {
        let call = Call::RemoveAttribute(element.clone(), name.to_owned());
        self.apply(element, call, |e| {
            e.attributes.remove(name);
        })
    }

    fn set_style_property(&self, element: &String, name: &str, value: &str) -> Result<()> {
        let call = Call::SetStyle(element.clone(), name.to_owned(), value.to_owned());
        self.apply(element, call, |e| {
            e.styles.insert(name.to_owned(), value.to_owned());
        })
    }

    fn remove_style_property(&self, element: &String, name: &str) -> Result<()> {
        let call = Call::RemoveStyle(element.clone(), name.to_owned());
        self.apply(element, call, |e| {
            e.styles.remove(name);
        })
    }

    fn dispatch_event(
        &self,
        element: &String,
        event_type: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<()> {
        let call = Call::Event(element.clone(), event_type.to_owned(), data.cloned());
        self.apply(element, call, |_| {})
    }

    fn set_form_value(&self, element: &String, value: &str) -> Result<()> {
        self.apply(element, Call::FormValue(element.clone(), value.to_owned()), |e| {
            e.value = value.to_owned();
        })
    }

    fn set_checked(&self, element: &String, checked: bool) -> Result<()> {
        self.apply(element, Call::Checked(element.clone(), checked), |e| {
            e.checked = checked;
        })
    }

    fn set_selected(&self, element: &String, values: &[&str]) -> Result<()> {
        self.apply(element, Call::Selected(element.clone(), owned(values)), |e| {
            e.selected = owned(values);
        })
    }

    fn set_animation(&self, element: &String, animation: &Animation) -> Result<()> {
        let call = Call::Animation(element.clone(), animation.clone());
        self.apply(element, call, |e| {
            e.animation = Some(animation.name.clone());
            e.play_state = Some(PlayState::Running);
        })
    }

    fn set_transition(&self, element: &String, transition: &Transition) -> Result<()> {
        let call = Call::Transition(element.clone(), transition.clone());
        self.apply(element, call, |e| {
            e.styles
                .insert(transition.property.clone(), transition.value.clone());
        })
    }

    fn remove_animation(&self, element: &String) -> Result<()> {
        self.apply(element, Call::RemoveAnimation(element.clone()), |e| {
            e.animation = None;
            e.play_state = None;
        })
    }

    fn set_animation_play_state(&self, element: &String, state: PlayState) -> Result<()> {
        self.apply(element, Call::PlayState(element.clone(), state), |e| {
            if e.animation.is_some() {
                e.play_state = Some(state);
            }
        })
    }

    fn animation_state(&self, element: &String) -> Result<AnimationState> {
        let element = self
            .element(element)
            .ok_or_else(|| Error::render(format!("{element} is detached")))?;
        Ok(AnimationState::new(element.animation, element.play_state))
    }

    fn define_keyframes(&self, element: &String, name: &str, keyframes: &Keyframes) -> Result<()> {
        let call = Call::Keyframes(element.clone(), name.to_owned(), keyframes.clone());
        self.apply(element, call, |_| {})
    }
}

/// Engine over a fresh document containing `ids`.
#[must_use]
pub fn engine_with(config: &Config, ids: &[&str]) -> (Engine<TestDom>, Arc<TestDom>) {
    let dom = Arc::new(TestDom::with_elements(ids));
    (Engine::new(config, Arc::clone(&dom)), dom)
}

#[track_caller]
pub fn applied(dispatch: Dispatch) -> Verb {
    match dispatch {
        Dispatch::Applied(verb) => verb,
        other => panic!("expected Applied, got {other:?}"),
    }
}

#[track_caller]
pub fn skipped(dispatch: Dispatch) -> Error {
    match dispatch {
        Dispatch::Skipped(error) => error,
        other => panic!("expected Skipped, got {other:?}"),
    }
}

#[track_caller]
pub fn failed(dispatch: Dispatch) -> Error {
    match dispatch {
        Dispatch::Failed(error) => error,
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[track_caller]
pub fn forwarded(dispatch: Dispatch) -> ParsedMessage {
    match dispatch {
        Dispatch::Forwarded(message) => message,
        other => panic!("expected Forwarded, got {other:?}"),
    }
}

/// Log to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    drop(
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init(),
    );
}
