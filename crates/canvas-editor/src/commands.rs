//! Canvas commands.
//!
//! Strategies never touch the document directly. They return commands, a
//! replayable description of what should change; [`crate::apply`] folds them
//! into document and overlay patches. Running a command is a pure function of
//! the document and overlay it is handed.

use crate::overlay::{CanvasOverlay, CursorStyle, IntendedBounds, OverlayPatch};
use crate::snapping::GuidelineWithSnappingVector;
use canvas_core::css::{CssNumber, CssUnit, FlexDirection};
use canvas_core::document::{Document, DocumentError, DocumentPatch, PropertyPath, get_prop, style_prop};
use canvas_core::geom::round_to;
use canvas_core::layout::ElementsToRerender;
use canvas_core::path::ElementPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// When a command takes part in the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhenToRun {
    /// Every tick and at commit.
    Always,
    /// Every tick, but not at commit (overlays, previews).
    MidInteraction,
    /// Only at commit.
    OnComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanvasCommand {
    /// Add a pixel amount to an existing length, keeping its unit.
    AdjustCssLengthProperty {
        when_to_run: WhenToRun,
        target: ElementPath,
        property: PropertyPath,
        value_px: f64,
        /// Size of the parent along the property's axis, for `%` values.
        parent_dimension_px: Option<f64>,
        /// Set in a flex child so the main-axis size lands on `flexBasis`
        /// when the element has one.
        parent_flex_direction: Option<FlexDirection>,
        create_if_not_existing: bool,
    },
    /// Overwrite a length. A pixel value written over an existing
    /// percentage is converted to a percentage.
    SetCssLengthProperty {
        when_to_run: WhenToRun,
        target: ElementPath,
        property: PropertyPath,
        value: CssNumber,
        parent_dimension_px: Option<f64>,
    },
    SetProperty {
        when_to_run: WhenToRun,
        target: ElementPath,
        property: PropertyPath,
        value: Value,
    },
    DeleteProperties {
        when_to_run: WhenToRun,
        target: ElementPath,
        properties: Vec<PropertyPath>,
    },
    ReorderElement {
        when_to_run: WhenToRun,
        target: ElementPath,
        index: usize,
    },
    ReparentElement {
        when_to_run: WhenToRun,
        target: ElementPath,
        new_parent: ElementPath,
        index: Option<usize>,
    },
    SetCursor {
        when_to_run: WhenToRun,
        cursor: CursorStyle,
    },
    SetSnappingGuidelines {
        when_to_run: WhenToRun,
        guidelines: Vec<GuidelineWithSnappingVector>,
    },
    UpdateHighlightedViews {
        when_to_run: WhenToRun,
        paths: Vec<ElementPath>,
    },
    /// Record where elements should end up; merged with bounds pushed by
    /// earlier commands of the same fold.
    PushIntendedBounds {
        when_to_run: WhenToRun,
        bounds: Vec<IntendedBounds>,
    },
    SetElementsToRerender {
        when_to_run: WhenToRun,
        scope: ElementsToRerender,
    },
}

/// The effect of running one command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutcome {
    pub document_patches: Vec<DocumentPatch>,
    pub overlay_patches: Vec<OverlayPatch>,
    pub description: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("element {0} not found")]
    ElementNotFound(ElementPath),
    #[error("{property} on {target} is not a length: {value}")]
    NotALength {
        target: ElementPath,
        property: PropertyPath,
        value: String,
    },
    #[error("{property} on {target} has no value to adjust")]
    MissingProperty {
        target: ElementPath,
        property: PropertyPath,
    },
    #[error("{property} on {target} uses `{unit}`, which has no pixel equivalent here")]
    UnsupportedUnit {
        target: ElementPath,
        property: PropertyPath,
        unit: &'static str,
    },
    #[error("{property} on {target} is a percentage of an unknown parent size")]
    MissingParentDimension {
        target: ElementPath,
        property: PropertyPath,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl CanvasCommand {
    pub fn when_to_run(&self) -> WhenToRun {
        match self {
            Self::AdjustCssLengthProperty { when_to_run, .. }
            | Self::SetCssLengthProperty { when_to_run, .. }
            | Self::SetProperty { when_to_run, .. }
            | Self::DeleteProperties { when_to_run, .. }
            | Self::ReorderElement { when_to_run, .. }
            | Self::ReparentElement { when_to_run, .. }
            | Self::SetCursor { when_to_run, .. }
            | Self::SetSnappingGuidelines { when_to_run, .. }
            | Self::UpdateHighlightedViews { when_to_run, .. }
            | Self::PushIntendedBounds { when_to_run, .. }
            | Self::SetElementsToRerender { when_to_run, .. } => *when_to_run,
        }
    }

    /// The element this command edits, if it edits one.
    pub fn target(&self) -> Option<&ElementPath> {
        match self {
            Self::AdjustCssLengthProperty { target, .. }
            | Self::SetCssLengthProperty { target, .. }
            | Self::SetProperty { target, .. }
            | Self::DeleteProperties { target, .. }
            | Self::ReorderElement { target, .. }
            | Self::ReparentElement { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Compute the patches this command produces against `document` and
    /// `overlay`. Neither is modified.
    pub fn run(&self, document: &Document, overlay: &CanvasOverlay) -> Result<CommandOutcome, CommandError> {
        match self {
            Self::AdjustCssLengthProperty {
                target,
                property,
                value_px,
                parent_dimension_px,
                parent_flex_direction,
                create_if_not_existing,
                ..
            } => {
                let props = element_props(document, target)?;
                let property = redirect_to_flex_basis(props, property, *parent_flex_direction);
                let new_value = match get_prop(props, &property) {
                    None | Some(Value::Null) => {
                        if !*create_if_not_existing {
                            return Err(CommandError::MissingProperty {
                                target: target.clone(),
                                property,
                            });
                        }
                        CssNumber::px(round_to(*value_px, 2))
                    }
                    Some(current) => {
                        let number = length_of(current, target, &property)?;
                        let current_px = number
                            .to_px(*parent_dimension_px)
                            .ok_or_else(|| unresolvable(&number, target, &property))?;
                        let adjusted = number
                            .px_in_same_unit(current_px + value_px, *parent_dimension_px)
                            .ok_or_else(|| unresolvable(&number, target, &property))?;
                        CssNumber {
                            value: round_to(adjusted.value, 2),
                            unit: adjusted.unit,
                        }
                    }
                };
                Ok(CommandOutcome {
                    description: format!(
                        "Adjust Css Length Prop: {target}/{property} by {}",
                        round_to(*value_px, 2)
                    ),
                    document_patches: vec![DocumentPatch::SetProp {
                        path: target.clone(),
                        prop: property,
                        value: new_value.to_json(),
                    }],
                    overlay_patches: Vec::new(),
                })
            }
            Self::SetCssLengthProperty {
                target,
                property,
                value,
                parent_dimension_px,
                ..
            } => {
                let props = element_props(document, target)?;
                let existing = get_prop(props, property).and_then(CssNumber::from_json);
                let written = match existing {
                    Some(current) if current.unit == Some(CssUnit::Percent) && value.unit.is_none() => current
                        .px_in_same_unit(value.value, *parent_dimension_px)
                        .ok_or_else(|| unresolvable(&current, target, property))?,
                    _ => *value,
                };
                let written = CssNumber {
                    value: round_to(written.value, 2),
                    unit: written.unit,
                };
                Ok(CommandOutcome {
                    description: format!("Set Css Length Prop: {target}/{property} to {}", written.to_json()),
                    document_patches: vec![DocumentPatch::SetProp {
                        path: target.clone(),
                        prop: property.clone(),
                        value: written.to_json(),
                    }],
                    overlay_patches: Vec::new(),
                })
            }
            Self::SetProperty {
                target,
                property,
                value,
                ..
            } => {
                element_props(document, target)?;
                Ok(CommandOutcome {
                    description: format!("Set Property {target}/{property} to {value}"),
                    document_patches: vec![DocumentPatch::SetProp {
                        path: target.clone(),
                        prop: property.clone(),
                        value: value.clone(),
                    }],
                    overlay_patches: Vec::new(),
                })
            }
            Self::DeleteProperties {
                target, properties, ..
            } => {
                let props = element_props(document, target)?;
                let document_patches = properties
                    .iter()
                    .filter(|p| get_prop(props, p).is_some())
                    .map(|p| DocumentPatch::RemoveProp {
                        path: target.clone(),
                        prop: p.clone(),
                    })
                    .collect();
                let names: Vec<String> = properties.iter().map(|p| p.to_string()).collect();
                Ok(CommandOutcome {
                    description: format!("Delete Properties {target}: {}", names.join(", ")),
                    document_patches,
                    overlay_patches: Vec::new(),
                })
            }
            Self::ReorderElement { target, index, .. } => {
                element_props(document, target)?;
                Ok(CommandOutcome {
                    description: format!("Reorder Element {target} to index {index}"),
                    document_patches: vec![DocumentPatch::Reorder {
                        path: target.clone(),
                        index: *index,
                    }],
                    overlay_patches: Vec::new(),
                })
            }
            Self::ReparentElement {
                target,
                new_parent,
                index,
                ..
            } => {
                element_props(document, target)?;
                element_props(document, new_parent)?;
                if new_parent.is_descendant_or_equal(target) {
                    return Err(DocumentError::InvalidReparent {
                        path: target.clone(),
                        new_parent: new_parent.clone(),
                    }
                    .into());
                }
                Ok(CommandOutcome {
                    description: format!("Reparent Element {target} to {new_parent}"),
                    document_patches: vec![DocumentPatch::Reparent {
                        path: target.clone(),
                        new_parent: new_parent.clone(),
                        index: *index,
                    }],
                    overlay_patches: Vec::new(),
                })
            }
            Self::SetCursor { cursor, .. } => Ok(overlay_only(
                format!("Set Cursor {cursor:?}"),
                OverlayPatch::SetCursor(Some(*cursor)),
            )),
            Self::SetSnappingGuidelines { guidelines, .. } => Ok(overlay_only(
                format!("Set {} Snapping Guidelines", guidelines.len()),
                OverlayPatch::SetGuidelines(guidelines.clone()),
            )),
            Self::UpdateHighlightedViews { paths, .. } => {
                let names: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
                Ok(overlay_only(
                    format!("Highlight Views: {}", names.join(", ")),
                    OverlayPatch::SetHighlightedViews(paths.clone()),
                ))
            }
            Self::PushIntendedBounds { bounds, .. } => {
                let mut merged: Vec<IntendedBounds> = overlay
                    .intended_bounds
                    .iter()
                    .filter(|existing| !bounds.iter().any(|b| b.target == existing.target))
                    .cloned()
                    .collect();
                merged.extend(bounds.iter().cloned());
                Ok(overlay_only(
                    format!("Push Intended Bounds for {} elements", bounds.len()),
                    OverlayPatch::SetIntendedBounds(merged),
                ))
            }
            Self::SetElementsToRerender { scope, .. } => Ok(overlay_only(
                format!("Set Elements To Rerender: {scope:?}"),
                OverlayPatch::SetElementsToRerender(scope.clone()),
            )),
        }
    }
}

fn overlay_only(description: String, patch: OverlayPatch) -> CommandOutcome {
    CommandOutcome {
        document_patches: Vec::new(),
        overlay_patches: vec![patch],
        description,
    }
}

fn element_props<'a>(document: &'a Document, target: &ElementPath) -> Result<&'a Map<String, Value>, CommandError> {
    document
        .props(target)
        .ok_or_else(|| CommandError::ElementNotFound(target.clone()))
}

fn length_of(value: &Value, target: &ElementPath, property: &PropertyPath) -> Result<CssNumber, CommandError> {
    CssNumber::from_json(value).ok_or_else(|| CommandError::NotALength {
        target: target.clone(),
        property: property.clone(),
        value: value.to_string(),
    })
}

fn unresolvable(number: &CssNumber, target: &ElementPath, property: &PropertyPath) -> CommandError {
    match number.unit {
        Some(CssUnit::Percent) => CommandError::MissingParentDimension {
            target: target.clone(),
            property: property.clone(),
        },
        unit => CommandError::UnsupportedUnit {
            target: target.clone(),
            property: property.clone(),
            unit: unit.map_or("px", |u| u.as_str()),
        },
    }
}

/// A flex child's main-axis size lives in `flexBasis` when it has one.
fn redirect_to_flex_basis(
    props: &Map<String, Value>,
    property: &PropertyPath,
    parent_flex_direction: Option<FlexDirection>,
) -> PropertyPath {
    let Some(direction) = parent_flex_direction else {
        return property.clone();
    };
    let main_size = PropertyPath::style(direction.main_size_pin().as_str());
    let has_basis = style_prop(props, "flexBasis").is_some_and(|v| !v.is_null());
    if *property == main_size && has_basis {
        PropertyPath::style("flexBasis")
    } else {
        property.clone()
    }
}
