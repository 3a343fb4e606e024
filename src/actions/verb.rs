use phf::phf_map;

/// Built-in verbs. Each maps onto one [`Renderer`](crate::render::Renderer) primitive.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum Verb {
    Update,
    Append,
    Prepend,
    /// Also reachable as `swap`
    Replace,
    Remove,
    Before,
    After,
    AddClass,
    RemoveClass,
    ToggleClass,
    SetAttr,
    RemoveAttr,
    SetStyle,
    RemoveStyle,
    Trigger,
    SetValue,
    SetChecked,
    SetSelected,
    Animate,
    Transition,
    RemoveAnimation,
    PauseAnimation,
    ResumeAnimation,
    GetAnimationState,
    Keyframe,
}

/// Wire name to verb, aliases included.
static BUILTIN_VERBS: phf::Map<&'static str, Verb> = phf_map! {
    "update" => Verb::Update,
    "append" => Verb::Append,
    "prepend" => Verb::Prepend,
    "replace" => Verb::Replace,
    "swap" => Verb::Replace,
    "remove" => Verb::Remove,
    "before" => Verb::Before,
    "after" => Verb::After,
    "addClass" => Verb::AddClass,
    "removeClass" => Verb::RemoveClass,
    "toggleClass" => Verb::ToggleClass,
    "setAttr" => Verb::SetAttr,
    "removeAttr" => Verb::RemoveAttr,
    "setStyle" => Verb::SetStyle,
    "removeStyle" => Verb::RemoveStyle,
    "trigger" => Verb::Trigger,
    "setValue" => Verb::SetValue,
    "setChecked" => Verb::SetChecked,
    "setSelected" => Verb::SetSelected,
    "animate" => Verb::Animate,
    "transition" => Verb::Transition,
    "removeAnimation" => Verb::RemoveAnimation,
    "pauseAnimation" => Verb::PauseAnimation,
    "resumeAnimation" => Verb::ResumeAnimation,
    "getAnimationState" => Verb::GetAnimationState,
    "keyframe" => Verb::Keyframe,
};

impl Verb {
    /// Look up a built-in by its wire name. Names are case-sensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTIN_VERBS.get(name).copied()
    }

    /// Every wire name with a built-in meaning, aliases included.
    pub fn builtin_names() -> impl Iterator<Item = (&'static str, Self)> {
        BUILTIN_VERBS.entries().map(|(name, verb)| (*name, *verb))
    }

    /// Wire name used when this verb is sent.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
