//! Declarative workflow definition
//!
//! Emits a States-Language style JSON document. Each task state targets one
//! step endpoint of this service; the orchestrator owns sequencing, the image
//! fan-out, retries and the failure route.

use serde_json::{json, Map, Value};

use crate::config::{PipelineConfig, RetryPolicyConfig};
use crate::steps::StepKind;

/// Error name a step reports when a retry might succeed
pub const RETRYABLE_ERROR: &str = "Step.Retryable";
/// Error name a step reports when retrying is pointless
pub const TERMINAL_ERROR: &str = "Step.Terminal";

const STATE_RESEARCH: &str = "Research";
const STATE_REFINE: &str = "Refine";
const STATE_IMAGE_PROMPTS: &str = "ImagePrompts";
const STATE_MARK_GENERATING: &str = "MarkGeneratingImages";
const STATE_GENERATE_IMAGES: &str = "GenerateImages";
const STATE_GENERATE_IMAGE: &str = "GenerateImage";
const STATE_METADATA: &str = "Metadata";
const STATE_ASSEMBLE: &str = "Assemble";
const STATE_MARK_FAILED: &str = "MarkFailed";
const STATE_FAILED: &str = "Failed";

#[derive(Debug, Clone)]
pub struct DefinitionOptions {
    pub name: String,
    /// Base URL task resources are built from
    pub step_base_url: String,
    pub image_max_concurrency: u32,
    pub retry: RetryPolicyConfig,
}

impl From<&PipelineConfig> for DefinitionOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            name: config.workflow.name.clone(),
            step_base_url: config.step_base_url(),
            image_max_concurrency: config.workflow.image_max_concurrency,
            retry: config.workflow.retry.clone(),
        }
    }
}

impl DefinitionOptions {
    fn resource(&self, step: StepKind) -> String {
        format!(
            "{}/api/v1/steps/{}",
            self.step_base_url.trim_end_matches('/'),
            step.as_str()
        )
    }

    fn retry(&self) -> Value {
        json!([{
            "ErrorEquals": [RETRYABLE_ERROR, "States.Timeout"],
            "IntervalSeconds": self.retry.interval_secs,
            "MaxAttempts": self.retry.max_attempts,
            "BackoffRate": self.retry.backoff_rate,
        }])
    }
}

fn catch_all() -> Value {
    json!([{
        "ErrorEquals": ["States.ALL"],
        "ResultPath": "$.error",
        "Next": STATE_MARK_FAILED,
    }])
}

/// Parameters shared by every content step
fn post_parameters() -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("postId.$".into(), json!("$.postId"));
    params.insert("websiteId.$".into(), json!("$.websiteId"));
    params
}

fn with_title(mut params: Map<String, Value>) -> Map<String, Value> {
    params.insert("blogTitle.$".into(), json!("$.blogTitle"));
    params
}

fn task(
    options: &DefinitionOptions,
    step: StepKind,
    parameters: Map<String, Value>,
    result_path: Value,
    next: Option<&str>,
    catch: bool,
) -> Value {
    let mut state = json!({
        "Type": "Task",
        "Resource": options.resource(step),
        "Parameters": parameters,
        "ResultPath": result_path,
        "Retry": options.retry(),
    });
    if let Value::Object(fields) = &mut state {
        match next {
            Some(next) => fields.insert("Next".into(), json!(next)),
            None => fields.insert("End".into(), json!(true)),
        };
        if catch {
            fields.insert("Catch".into(), catch_all());
        }
    }
    state
}

/// Build the full definition document
pub fn build_definition(options: &DefinitionOptions) -> Value {
    let mut states = Map::new();

    let mut research = with_title(post_parameters());
    research.insert("description.$".into(), json!("$.description"));
    states.insert(
        STATE_RESEARCH.into(),
        task(options, StepKind::Research, research, json!("$.research"), Some(STATE_REFINE), true),
    );

    let mut refine = with_title(post_parameters());
    refine.insert(
        "researchArticleUri.$".into(),
        json!("$.research.researchArticleUri"),
    );
    states.insert(
        STATE_REFINE.into(),
        task(options, StepKind::Refine, refine, json!("$.refine"), Some(STATE_IMAGE_PROMPTS), true),
    );

    let mut prompts = with_title(post_parameters());
    prompts.insert("refinedArticleUri.$".into(), json!("$.refine.refinedArticleUri"));
    states.insert(
        STATE_IMAGE_PROMPTS.into(),
        task(
            options,
            StepKind::ImagePrompt,
            prompts,
            json!("$.imagePrompts"),
            Some(STATE_MARK_GENERATING),
            true,
        ),
    );

    let mut mark_generating = Map::new();
    mark_generating.insert("postId.$".into(), json!("$.postId"));
    mark_generating.insert("status".into(), json!("generating_images"));
    states.insert(
        STATE_MARK_GENERATING.into(),
        task(
            options,
            StepKind::UpdateStatus,
            mark_generating,
            Value::Null,
            Some(STATE_GENERATE_IMAGES),
            true,
        ),
    );

    let mut item = Map::new();
    item.insert("postId.$".into(), json!("$.postId"));
    item.insert("websiteId.$".into(), json!("$.websiteId"));
    item.insert("prompt.$".into(), json!("$$.Map.Item.Value"));

    let mut generate_image = task(
        options,
        StepKind::ImageGen,
        post_parameters(),
        json!("$"),
        None,
        false,
    );
    // Item parameters come from the ItemSelector.
    if let Value::Object(fields) = &mut generate_image {
        fields.remove("Parameters");
        fields.remove("ResultPath");
    }

    states.insert(
        STATE_GENERATE_IMAGES.into(),
        json!({
            "Type": "Map",
            "ItemsPath": "$.imagePrompts.prompts",
            "MaxConcurrency": options.image_max_concurrency,
            "ItemSelector": item,
            "ItemProcessor": {
                "StartAt": STATE_GENERATE_IMAGE,
                "States": { STATE_GENERATE_IMAGE: generate_image },
            },
            "ResultPath": "$.images",
            "Next": STATE_METADATA,
            "Catch": catch_all(),
        }),
    );

    let mut metadata = with_title(post_parameters());
    metadata.insert("refinedArticleUri.$".into(), json!("$.refine.refinedArticleUri"));
    states.insert(
        STATE_METADATA.into(),
        task(options, StepKind::Metadata, metadata, json!("$.metadata"), Some(STATE_ASSEMBLE), true),
    );

    let mut assemble = with_title(post_parameters());
    assemble.insert("refinedArticleUri.$".into(), json!("$.refine.refinedArticleUri"));
    assemble.insert("images.$".into(), json!("$.images"));
    assemble.insert("metadata.$".into(), json!("$.metadata"));
    states.insert(
        STATE_ASSEMBLE.into(),
        task(options, StepKind::Assemble, assemble, json!("$.result"), None, true),
    );

    let mut mark_failed = Map::new();
    mark_failed.insert("postId.$".into(), json!("$.postId"));
    mark_failed.insert("status".into(), json!("failed"));
    mark_failed.insert("error.$".into(), json!("$.error"));
    states.insert(
        STATE_MARK_FAILED.into(),
        task(
            options,
            StepKind::UpdateStatus,
            mark_failed,
            Value::Null,
            Some(STATE_FAILED),
            false,
        ),
    );

    states.insert(
        STATE_FAILED.into(),
        json!({
            "Type": "Fail",
            "Error": "ContentPipelineFailed",
            "Cause": "A pipeline step failed; see the post record for details",
        }),
    );

    json!({
        "Comment": format!("{} content generation workflow", options.name),
        "StartAt": STATE_RESEARCH,
        "States": states,
    })
}

/// Names of states reachable from `state` through `Next`, `Catch` or `Default`
pub fn transitions(state: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(next) = state.get("Next").and_then(Value::as_str) {
        out.push(next.to_string());
    }
    if let Some(catches) = state.get("Catch").and_then(Value::as_array) {
        out.extend(
            catches
                .iter()
                .filter_map(|c| c.get("Next").and_then(Value::as_str))
                .map(str::to_string),
        );
    }
    out
}

/// Check that every transition names an existing state and that the start
/// state exists. Returns the offending names.
pub fn dangling_transitions(definition: &Value) -> Vec<String> {
    let Some(states) = definition.get("States").and_then(Value::as_object) else {
        return vec!["States".to_string()];
    };
    let mut missing = Vec::new();
    if let Some(start) = definition.get("StartAt").and_then(Value::as_str) {
        if !states.contains_key(start) {
            missing.push(start.to_string());
        }
    }
    for state in states.values() {
        for next in transitions(state) {
            if !states.contains_key(&next) {
                missing.push(next);
            }
        }
        if let Some(processor) = state.get("ItemProcessor") {
            missing.extend(dangling_transitions(processor));
        }
    }
    missing
}
