//! Built-in verbs, one renderer call each.

use serde_json::{Map, Value};

use super::verb::Verb;
use crate::Result;
use crate::error::Error;
use crate::protocol::ParsedMessage;
use crate::render::{Animation, Keyframes, PlayState, Position, Renderer, Transition};
use crate::security::{JsonPolicy, SecurityViolation, safe_merge};

/// Event fired on an element in answer to `getAnimationState`.
pub const ANIMATION_STATE_EVENT: &str = "animationstate";

const DEFAULT_ANIMATION_DURATION: &str = "1s";
const DEFAULT_ANIMATION_ITERATIONS: &str = "1";
const DEFAULT_TRANSITION_DURATION: &str = "300ms";
const DEFAULT_TIMING_FUNCTION: &str = "ease";

/// Apply `verb` to `target` with the arguments carried by `message`.
pub(crate) fn apply<R: Renderer>(
    verb: Verb,
    renderer: &R,
    target: &R::Element,
    message: &ParsedMessage,
    json: &JsonPolicy,
) -> Result<()> {
    let subject = message.subject.as_str();

    match verb {
        Verb::Update => renderer.set_inner_html(target, subject),
        Verb::Append => renderer.insert_adjacent(target, Position::BeforeEnd, subject),
        Verb::Prepend => renderer.insert_adjacent(target, Position::AfterBegin, subject),
        Verb::Replace => renderer.set_outer_html(target, subject),
        Verb::Remove => renderer.remove_element(target),
        Verb::Before => renderer.insert_adjacent(target, Position::BeforeBegin, subject),
        Verb::After => renderer.insert_adjacent(target, Position::AfterEnd, subject),
        Verb::AddClass => with_class_list(subject, |names| renderer.add_classes(target, names)),
        Verb::RemoveClass => {
            with_class_list(subject, |names| renderer.remove_classes(target, names))
        }
        Verb::ToggleClass => {
            with_class_list(subject, |names| renderer.toggle_classes(target, names))
        }
        Verb::SetAttr => {
            let name = required(verb, "attribute name", subject)?;
            renderer.set_attribute(target, name, message.option(0).unwrap_or_default())
        }
        Verb::RemoveAttr => {
            let name = required(verb, "attribute name", subject)?;
            renderer.remove_attribute(target, name)
        }
        Verb::SetStyle => {
            let property = required(verb, "style property", subject)?;
            renderer.set_style_property(target, property, message.option(0).unwrap_or_default())
        }
        Verb::RemoveStyle => {
            let property = required(verb, "style property", subject)?;
            renderer.remove_style_property(target, property)
        }
        Verb::Trigger => trigger(renderer, target, message, json),
        Verb::SetValue => renderer.set_form_value(target, subject),
        Verb::SetChecked => renderer.set_checked(target, parse_flag(subject)),
        Verb::SetSelected => {
            let values: Vec<&str> = subject
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .collect();
            renderer.set_selected(target, &values)
        }
        Verb::Animate => {
            let animation = Animation {
                name: required(verb, "animation name", subject)?.to_owned(),
                duration: option_or(message, 0, DEFAULT_ANIMATION_DURATION),
                timing_function: option_or(message, 1, DEFAULT_TIMING_FUNCTION),
                iteration_count: option_or(message, 2, DEFAULT_ANIMATION_ITERATIONS),
            };
            renderer.set_animation(target, &animation)
        }
        Verb::Transition => {
            let transition = Transition {
                property: required(verb, "property", subject)?.to_owned(),
                value: message
                    .non_empty_option(0)
                    .ok_or_else(|| Error::missing_argument(verb.as_str(), "value"))?
                    .to_owned(),
                duration: option_or(message, 1, DEFAULT_TRANSITION_DURATION),
                timing_function: option_or(message, 2, DEFAULT_TIMING_FUNCTION),
            };
            renderer.set_transition(target, &transition)
        }
        Verb::RemoveAnimation => renderer.remove_animation(target),
        Verb::PauseAnimation => renderer.set_animation_play_state(target, PlayState::Paused),
        Verb::ResumeAnimation => renderer.set_animation_play_state(target, PlayState::Running),
        Verb::GetAnimationState => {
            let state = renderer.animation_state(target)?;
            let data = match serde_json::to_value(&state)? {
                Value::Object(fields) => fields,
                _ => Map::new(),
            };
            renderer.dispatch_event(target, ANIMATION_STATE_EVENT, Some(&data))
        }
        Verb::Keyframe => {
            let name = required(verb, "keyframes name", subject)?;
            let definition = message
                .non_empty_option(0)
                .ok_or_else(|| Error::missing_argument(verb.as_str(), "keyframes definition"))?;
            let keyframes: Keyframes = serde_json::from_value(json.parse(definition)?)
                .map_err(SecurityViolation::MalformedJson)?;
            renderer.define_keyframes(target, name, &keyframes)
        }
    }
}

/// `trigger|id|type[|json]`: the payload's own top-level keys become event data.
fn trigger<R: Renderer>(
    renderer: &R,
    target: &R::Element,
    message: &ParsedMessage,
    json: &JsonPolicy,
) -> Result<()> {
    let event_type = required(Verb::Trigger, "event type", &message.subject)?;

    let data = match message.non_empty_option(0) {
        Some(text) => {
            let payload = json.parse(text)?;
            let mut data = Map::new();
            safe_merge(&mut data, &payload);
            Some(data)
        }
        None => None,
    };

    renderer.dispatch_event(target, event_type, data.as_ref())
}

fn required<'a>(verb: Verb, argument: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(Error::missing_argument(verb.as_str(), argument))
    } else {
        Ok(value)
    }
}

fn option_or(message: &ParsedMessage, index: usize, default: &str) -> String {
    message.non_empty_option(index).unwrap_or(default).to_owned()
}

/// Whitespace-separated, de-duplicated. An empty list makes no renderer call.
fn with_class_list<F>(subject: &str, apply: F) -> Result<()>
where
    F: FnOnce(&[&str]) -> Result<()>,
{
    let mut names: Vec<&str> = Vec::new();
    for name in subject.split_whitespace() {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Ok(());
    }
    apply(&names)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "checked"
    )
}
