//! Prompt Composer
//!
//! Splits every request into a static, cacheable instruction block and a
//! per-request user block. The instruction blocks are built once per process
//! so the provider sees byte-identical text and can replay its cache.

use crate::error::CompositionError;
use crate::llm::{ConversationMessage, Prompt, Role, SystemSegment};
use crate::validate::{ALLOWED_MODULES, DENY_LIST};
use std::sync::LazyLock;

/// Name of the default-exported component the model must produce.
pub const COMPONENT_NAME: &str = "GeneratedApp";

/// Whether a request starts a new app or modifies the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Fresh,
    FollowUp,
}

/// One call into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub user_text: String,
    pub history: Vec<ConversationMessage>,
    pub kind: RequestKind,
}

impl GenerationRequest {
    /// Infer the kind from the history: more than one message means follow-up.
    pub fn new(user_text: impl Into<String>, history: Vec<ConversationMessage>) -> Self {
        let kind = if history.len() > 1 {
            RequestKind::FollowUp
        } else {
            RequestKind::Fresh
        };
        Self {
            user_text: user_text.into(),
            history,
            kind,
        }
    }

    /// New app from an idea. History holds just the idea itself.
    pub fn fresh(user_text: impl Into<String>) -> Self {
        let user_text = user_text.into();
        Self {
            history: vec![ConversationMessage::user(user_text.clone())],
            user_text,
            kind: RequestKind::Fresh,
        }
    }

    /// Modification of the most recent assistant code in `history`.
    pub fn follow_up(user_text: impl Into<String>, history: Vec<ConversationMessage>) -> Self {
        Self {
            user_text: user_text.into(),
            history,
            kind: RequestKind::FollowUp,
        }
    }

    pub fn is_follow_up(&self) -> bool {
        self.kind == RequestKind::FollowUp
    }
}

/// Most recent assistant message, i.e. the code a follow-up modifies.
pub fn previous_code(history: &[ConversationMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|msg| msg.role == Role::Assistant)
        .map(|msg| msg.content.as_str())
}

/// Build the prompt for `request`.
pub fn compose(request: &GenerationRequest) -> Result<Prompt, CompositionError> {
    match request.kind {
        RequestKind::Fresh => Ok(Prompt::new(
            SystemSegment::cached(GENERATION_INSTRUCTIONS.as_str()),
            format!("App idea: \"{}\"", request.user_text.trim()),
        )),
        RequestKind::FollowUp => {
            let base = previous_code(&request.history).ok_or(CompositionError::MissingPriorCode)?;
            Ok(Prompt::new(
                SystemSegment::cached(MODIFICATION_INSTRUCTIONS.as_str()),
                format!(
                    "PREVIOUS APP CODE:\n{}\n\nUSER'S MODIFICATION REQUEST: \"{}\"",
                    base,
                    request.user_text.trim()
                ),
            ))
        }
    }
}

fn allowed_imports_list() -> String {
    ALLOWED_MODULES
        .iter()
        .map(|module| format!("   - {}", module))
        .collect::<Vec<_>>()
        .join("\n")
}

fn forbidden_list() -> String {
    DENY_LIST
        .iter()
        .map(|denied| {
            format!(
                "- {} ({} is not available in the preview)",
                denied.names.join(", "),
                denied.capability
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static GENERATION_INSTRUCTIONS: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are an expert React Native developer using Expo. Generate a complete, production-ready React Native app based on the user's app idea below.

SYNTAX IS CRITICAL: the code must be syntactically perfect JavaScript.

1. Output ONLY the component source. No explanations, no markdown, no backticks.
2. Every statement ends with a semicolon; every array and object has correct commas; every bracket is balanced.
3. Start with: import React from 'react';
4. Use ONLY these imports:
{allowed}
5. Put ALL code in a single function component and end with: export default function {name}()
6. Use useState/useEffect for state, StyleSheet.create() for ALL styling, and realistic sample data (5-10 items).
7. Follow iOS Human Interface Guidelines: at least 16px padding, 44pt touch targets, 12-16px rounded corners, subtle shadows.
8. Use single quotes for JavaScript strings. JSX attribute values may use double quotes.

SAFE AREA AND LISTS:
- Import SafeAreaView from 'react-native-safe-area-context' and wrap all content in <SafeAreaView style={{{{flex: 1}}}} edges={{['top', 'bottom']}}>.
- Include a StatusBar component at the top.
- Render lists with FlatList and ALWAYS pass keyExtractor={{(item) => item.id.toString()}}. Do not render lists with .map().
- Images use remote URIs: {{{{ uri: 'https://via.placeholder.com/150' }}}}. Never require() local images.
- Give every TextInput both value and onChangeText.
- Guard array and property access; guard divisions against zero.

NEVER USE:
- SafeAreaView from 'react-native'
- react-native-vector-icons (use @expo/vector-icons)
- fetch() calls to external APIs
{forbidden}
- Any library not in the allowed imports

The user must be able to paste the code into Expo Snack and run it unchanged."#,
        allowed = allowed_imports_list(),
        name = COMPONENT_NAME,
        forbidden = forbidden_list(),
    )
});

static MODIFICATION_INSTRUCTIONS: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are an expert React Native developer using Expo. The user wants to modify an existing app. You will receive the previous app code and the requested change.

Update the code to apply the change. Output ONLY the complete updated component source. No explanations, no markdown, no backticks.

REQUIREMENTS:
1. Keep all existing functionality unless the user explicitly asks to change it.
2. Apply the requested modification cleanly and keep the same structure and style.
3. Keep the component named {name} and default-exported.
4. Import SafeAreaView from 'react-native-safe-area-context' (NOT react-native) and keep StatusBar.
5. Use ONLY these imports:
{allowed}
6. FlatList always has a keyExtractor. Images use remote URIs.
7. Follow iOS Human Interface Guidelines (generous spacing, 44pt touch targets, iOS colors).

NEVER USE:
- AsyncStorage, react-native-vector-icons, fetch() calls, require() for images
{forbidden}"#,
        name = COMPONENT_NAME,
        allowed = allowed_imports_list(),
        forbidden = forbidden_list(),
    )
});
