//! Command application: folds a command list into a new document and overlay.
//!
//! Commands run in list order and each one sees the patches of the ones
//! before it. A failing command contributes nothing; its error is kept as a
//! diagnostic and the fold carries on with the next command.

use crate::commands::{CanvasCommand, CommandError, WhenToRun};
use crate::overlay::CanvasOverlay;
use canvas_core::document::{Document, DocumentPatchSink};
use log::{trace, warn};

/// Whether the fold runs during the interaction or for its commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    MidInteraction,
    EndInteraction,
}

impl CommandPhase {
    pub fn runs(&self, when: WhenToRun) -> bool {
        matches!(
            (self, when),
            (_, WhenToRun::Always)
                | (CommandPhase::MidInteraction, WhenToRun::MidInteraction)
                | (CommandPhase::EndInteraction, WhenToRun::OnComplete)
        )
    }
}

/// A command that failed during a fold.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDiagnostic {
    /// Position of the command in the list it was folded from.
    pub index: usize,
    pub command: CanvasCommand,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub document: Document,
    pub overlay: CanvasOverlay,
    pub descriptions: Vec<String>,
    pub diagnostics: Vec<CommandDiagnostic>,
}

/// Fold `commands` that run in `phase` over a copy of `document`.
pub fn apply_commands(
    document: &Document,
    overlay: &CanvasOverlay,
    commands: &[CanvasCommand],
    phase: CommandPhase,
) -> ApplyResult {
    let mut result = ApplyResult {
        document: document.clone(),
        overlay: overlay.clone(),
        descriptions: Vec::new(),
        diagnostics: Vec::new(),
    };
    for (index, command) in commands.iter().enumerate() {
        if !phase.runs(command.when_to_run()) {
            continue;
        }
        match apply_one(&mut result, command) {
            Ok(description) => {
                trace!("applied {description}");
                result.descriptions.push(description);
            }
            Err(error) => {
                warn!("command {index} skipped: {error}");
                result.diagnostics.push(CommandDiagnostic {
                    index,
                    command: command.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
    result
}

fn apply_one(result: &mut ApplyResult, command: &CanvasCommand) -> Result<String, CommandError> {
    let outcome = command.run(&result.document, &result.overlay)?;
    if !outcome.document_patches.is_empty() {
        // patches land on a copy so a failing one leaves nothing behind
        let mut scratch = result.document.clone();
        scratch.apply_patches(&outcome.document_patches)?;
        result.document = scratch;
    }
    for patch in outcome.overlay_patches {
        result.overlay.apply(patch);
    }
    Ok(outcome.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::css::CssNumber;
    use canvas_core::document::PropertyPath;
    use canvas_core::path::ElementPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCENE: &str = r#"{ "uid": "sb", "children": [
        { "uid": "a", "props": { "style": { "left": 10 } } },
        { "uid": "b", "props": { "style": { "left": "auto" } } }
    ] }"#;

    const LENGTHS: &str = r#"{ "uid": "sb", "children": [
        { "uid": "a", "props": { "style": { "left": 10, "width": "50%" } } }
    ] }"#;

    fn p(s: &str) -> ElementPath {
        ElementPath::parse(s).unwrap()
    }

    fn adjust_left(target: &str, by: f64, when_to_run: WhenToRun) -> CanvasCommand {
        CanvasCommand::AdjustCssLengthProperty {
            when_to_run,
            target: p(target),
            property: PropertyPath::style("left"),
            value_px: by,
            parent_dimension_px: None,
            parent_flex_direction: None,
            create_if_not_existing: false,
        }
    }

    fn set_px(target: &str, prop: &str, value: f64, parent: Option<f64>) -> CanvasCommand {
        CanvasCommand::SetCssLengthProperty {
            when_to_run: WhenToRun::Always,
            target: p(target),
            property: PropertyPath::style(prop),
            value: CssNumber::px(value),
            parent_dimension_px: parent,
        }
    }

    fn fold(doc: &Document, commands: &[CanvasCommand]) -> Document {
        let result = apply_commands(doc, &CanvasOverlay::default(), commands, CommandPhase::MidInteraction);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        result.document
    }

    #[test]
    fn absolute_set_is_idempotent() {
        let doc = Document::from_json(LENGTHS).unwrap();
        let set_left = set_px("sb/a", "left", 40.0, None);
        let set_width = set_px("sb/a", "width", 100.0, Some(400.0));
        let once = fold(&doc, &[set_left.clone(), set_width.clone()]);
        let twice = fold(&once, &[set_left.clone(), set_width.clone(), set_left, set_width]);
        assert_eq!(twice.to_scene(), once.to_scene());
        assert_eq!(once.get_prop(&p("sb/a"), &PropertyPath::style("width")), Some(&json!("25%")));
    }

    #[test]
    fn relative_adjust_matches_the_equivalent_set() {
        let doc = Document::from_json(LENGTHS).unwrap();
        let adjusted = fold(
            &doc,
            &[
                adjust_left("sb/a", 5.0, WhenToRun::Always),
                CanvasCommand::AdjustCssLengthProperty {
                    when_to_run: WhenToRun::Always,
                    target: p("sb/a"),
                    property: PropertyPath::style("width"),
                    value_px: 20.0,
                    parent_dimension_px: Some(400.0),
                    parent_flex_direction: None,
                    create_if_not_existing: false,
                },
            ],
        );
        let set = fold(
            &doc,
            &[
                set_px("sb/a", "left", 15.0, None),
                set_px("sb/a", "width", 220.0, Some(400.0)),
            ],
        );
        assert_eq!(adjusted.to_scene(), set.to_scene());
        assert_eq!(adjusted.get_prop(&p("sb/a"), &PropertyPath::style("width")), Some(&json!("55%")));
    }

    #[test]
    fn later_commands_see_earlier_patches() {
        let doc = Document::from_json(SCENE).unwrap();
        let commands = vec![
            adjust_left("sb/a", 5.0, WhenToRun::Always),
            adjust_left("sb/a", 5.0, WhenToRun::Always),
        ];
        let result = apply_commands(&doc, &CanvasOverlay::default(), &commands, CommandPhase::MidInteraction);
        assert_eq!(
            result.document.get_prop(&p("sb/a"), &PropertyPath::style("left")),
            Some(&json!(20))
        );
        assert_eq!(result.descriptions.len(), 2);
    }

    #[test]
    fn failures_become_diagnostics() {
        let doc = Document::from_json(SCENE).unwrap();
        let commands = vec![
            adjust_left("sb/b", 5.0, WhenToRun::Always),
            adjust_left("sb/a", 5.0, WhenToRun::Always),
        ];
        let result = apply_commands(&doc, &CanvasOverlay::default(), &commands, CommandPhase::MidInteraction);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].index, 0);
        assert_eq!(
            result.document.get_prop(&p("sb/a"), &PropertyPath::style("left")),
            Some(&json!(15))
        );
        assert_eq!(
            result.document.get_prop(&p("sb/b"), &PropertyPath::style("left")),
            Some(&json!("auto"))
        );
    }

    #[test]
    fn phases_filter_commands() {
        let doc = Document::from_json(SCENE).unwrap();
        let commands = vec![
            adjust_left("sb/a", 1.0, WhenToRun::MidInteraction),
            adjust_left("sb/a", 10.0, WhenToRun::OnComplete),
        ];
        let mid = apply_commands(&doc, &CanvasOverlay::default(), &commands, CommandPhase::MidInteraction);
        assert_eq!(
            mid.document.get_prop(&p("sb/a"), &PropertyPath::style("left")),
            Some(&json!(11))
        );
        let end = apply_commands(&doc, &CanvasOverlay::default(), &commands, CommandPhase::EndInteraction);
        assert_eq!(
            end.document.get_prop(&p("sb/a"), &PropertyPath::style("left")),
            Some(&json!(20))
        );
    }

    #[test]
    fn rejected_reparent_leaves_the_document_intact() {
        let doc = Document::from_json(
            r#"{ "uid": "sb", "children": [
                { "uid": "a", "children": [{ "uid": "card" }] },
                { "uid": "b", "children": [{ "uid": "card" }] },
                { "uid": "other", "props": { "style": { "left": 1 } } }
            ] }"#,
        )
        .unwrap();
        let before = doc.paths();
        let commands = vec![
            CanvasCommand::ReparentElement {
                when_to_run: WhenToRun::Always,
                target: p("sb/a/card"),
                new_parent: p("sb/b"),
                index: None,
            },
            adjust_left("sb/other", 5.0, WhenToRun::Always),
        ];
        let result = apply_commands(&doc, &CanvasOverlay::default(), &commands, CommandPhase::MidInteraction);

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].index, 0);
        assert_eq!(result.diagnostics[0].error, "duplicate element path sb/b/card");
        assert_eq!(result.document.paths(), before);
        // the fold carries on over the whole tree
        assert_eq!(
            result.document.get_prop(&p("sb/other"), &PropertyPath::style("left")),
            Some(&json!(6))
        );
    }
}
