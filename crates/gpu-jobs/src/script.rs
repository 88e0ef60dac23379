//! Remote script templates.
//!
//! A [`ScriptTemplate`] pairs a fixed, versioned script source with the
//! structured parameters it runs with. The source never changes with the
//! request: the model name, task and hyperparameters reach the script through
//! environment variables (`MODEL_NAME`, `TASK`, `JOB_PARAMS`), so no model id
//! or prompt is ever spliced into code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::providers::traits::Task;

/// Current template revision, exported to jobs as `TEMPLATE_VERSION`.
pub const TEMPLATE_VERSION: u32 = 1;

/// Environment variable names read by the generated scripts.
pub mod env {
    /// Model identifier.
    pub const MODEL_NAME: &str = "MODEL_NAME";
    /// Task name.
    pub const TASK: &str = "TASK";
    /// JSON-encoded [`ScriptParams`](super::ScriptParams).
    pub const JOB_PARAMS: &str = "JOB_PARAMS";
    /// Template revision.
    pub const TEMPLATE_VERSION: &str = "TEMPLATE_VERSION";
    /// Hugging Face hub token.
    pub const HF_TOKEN: &str = "HF_TOKEN";
}

/// Hyperparameters for the causal-LM training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Hugging Face dataset name.
    pub dataset: String,
    /// Dataset configuration name.
    pub dataset_config: Option<String>,
    /// Number of epochs.
    pub epochs: u32,
    /// Per-device batch size.
    pub batch_size: u32,
    /// Learning rate.
    pub learning_rate: f64,
    /// Weight decay.
    pub weight_decay: f64,
    /// Tokenizer truncation / padding length.
    pub max_length: u32,
    /// Checkpoint every N steps.
    pub save_steps: u32,
    /// Log every N steps.
    pub logging_steps: u32,
    /// Directory the trained model is saved to.
    pub output_dir: String,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            dataset: "wikitext".to_string(),
            dataset_config: Some("wikitext-2-raw-v1".to_string()),
            epochs: 1,
            batch_size: 4,
            learning_rate: 2e-5,
            weight_decay: 0.01,
            max_length: 512,
            save_steps: 500,
            logging_steps: 100,
            output_dir: "./fine-tuned-model".to_string(),
        }
    }
}

/// Parameters for the text-generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    /// Prompts to generate from.
    pub prompts: Vec<String>,
    /// Maximum generated length.
    pub max_length: u32,
    /// File the prompt/response pairs are written to.
    pub results_file: String,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            prompts: vec![
                "Write a Python function to calculate fibonacci:".to_string(),
                "Explain machine learning in simple terms:".to_string(),
                "What is the capital of France?".to_string(),
            ],
            max_length: 100,
            results_file: "inference_results.json".to_string(),
        }
    }
}

/// Parameters for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptParams {
    /// Training / fine-tuning.
    Training(TrainingParams),
    /// Inference.
    Inference(InferenceParams),
}

/// Optional overrides applied on top of the template defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    /// Number of epochs.
    pub epochs: Option<u32>,
    /// Per-device batch size.
    pub batch_size: Option<u32>,
    /// Learning rate.
    pub learning_rate: Option<f64>,
    /// Dataset as `name` or `name:config`.
    pub dataset: Option<String>,
}

/// A versioned, parameterized remote script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptTemplate {
    /// Template revision.
    pub version: u32,
    /// Task the template runs.
    pub task: Task,
    /// Runtime parameters.
    pub params: ScriptParams,
}

impl ScriptTemplate {
    /// Default template for a task.
    #[must_use]
    pub fn for_task(task: Task) -> Self {
        let params = if task.is_training() {
            ScriptParams::Training(TrainingParams::default())
        } else {
            ScriptParams::Inference(InferenceParams::default())
        };

        Self {
            version: TEMPLATE_VERSION,
            task,
            params,
        }
    }

    /// Apply overrides. Training-only overrides are ignored for inference.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Self {
        if let ScriptParams::Training(params) = &mut self.params {
            if let Some(epochs) = overrides.epochs {
                params.epochs = epochs;
            }
            if let Some(batch_size) = overrides.batch_size {
                params.batch_size = batch_size;
            }
            if let Some(learning_rate) = overrides.learning_rate {
                params.learning_rate = learning_rate;
            }
            if let Some(dataset) = &overrides.dataset {
                match dataset.split_once(':') {
                    Some((name, config)) => {
                        params.dataset = name.to_string();
                        params.dataset_config = Some(config.to_string());
                    }
                    None => {
                        params.dataset.clone_from(dataset);
                        params.dataset_config = None;
                    }
                }
            }
        }
        self
    }

    /// Script source for this template.
    #[must_use]
    pub fn source(&self) -> &'static str {
        if self.task.is_training() {
            TRAIN_SCRIPT_V1
        } else {
            INFERENCE_SCRIPT_V1
        }
    }

    /// Environment the script expects.
    ///
    /// # Errors
    /// Returns an error if the parameters cannot be serialized.
    pub fn env(
        &self,
        model: &str,
        hf_token: Option<&str>,
    ) -> Result<BTreeMap<String, String>, serde_json::Error> {
        let mut vars = BTreeMap::new();
        vars.insert(env::MODEL_NAME.to_string(), model.to_string());
        vars.insert(env::TASK.to_string(), self.task.to_string());
        vars.insert(env::JOB_PARAMS.to_string(), serde_json::to_string(&self.params)?);
        vars.insert(env::TEMPLATE_VERSION.to_string(), self.version.to_string());
        if let Some(token) = hf_token {
            vars.insert(env::HF_TOKEN.to_string(), token.to_string());
        }
        Ok(vars)
    }
}

/// Python packages a task needs on top of the base image.
#[must_use]
pub fn pip_packages(task: Task) -> &'static [&'static str] {
    if task.is_training() {
        &["transformers", "accelerate", "datasets"]
    } else {
        &["transformers", "accelerate"]
    }
}

const TRAIN_SCRIPT_V1: &str = r##"import json
import os

import torch
from datasets import load_dataset
from transformers import (
    AutoModelForCausalLM,
    AutoTokenizer,
    DataCollatorForLanguageModeling,
    Trainer,
    TrainingArguments,
)


def main():
    model_name = os.environ["MODEL_NAME"]
    params = json.loads(os.environ["JOB_PARAMS"])
    hf_token = os.getenv("HF_TOKEN")

    print(f"Starting {os.environ.get('TASK', 'train')} for {model_name}")

    model = AutoModelForCausalLM.from_pretrained(
        model_name,
        token=hf_token,
        torch_dtype=torch.float16,
        device_map="auto",
    )
    tokenizer = AutoTokenizer.from_pretrained(model_name, token=hf_token)
    if tokenizer.pad_token is None:
        tokenizer.pad_token = tokenizer.eos_token

    dataset = load_dataset(params["dataset"], params.get("dataset_config"))

    def tokenize_function(examples):
        return tokenizer(
            examples["text"],
            truncation=True,
            padding="max_length",
            max_length=params["max_length"],
        )

    tokenized_datasets = dataset.map(tokenize_function, batched=True)

    training_args = TrainingArguments(
        output_dir="./results",
        num_train_epochs=params["epochs"],
        per_device_train_batch_size=params["batch_size"],
        save_steps=params["save_steps"],
        logging_steps=params["logging_steps"],
        learning_rate=params["learning_rate"],
        weight_decay=params["weight_decay"],
        fp16=True,
        dataloader_pin_memory=False,
    )

    trainer = Trainer(
        model=model,
        args=training_args,
        train_dataset=tokenized_datasets["train"],
        data_collator=DataCollatorForLanguageModeling(tokenizer=tokenizer, mlm=False),
    )

    trainer.train()

    trainer.save_model(params["output_dir"])
    tokenizer.save_pretrained(params["output_dir"])

    print("Training complete")


if __name__ == "__main__":
    main()
"##;

const INFERENCE_SCRIPT_V1: &str = r##"import json
import os

import torch
from transformers import AutoModelForCausalLM, AutoTokenizer, pipeline


def main():
    model_name = os.environ["MODEL_NAME"]
    params = json.loads(os.environ["JOB_PARAMS"])
    hf_token = os.getenv("HF_TOKEN")

    print(f"Starting inference for {model_name}")

    tokenizer = AutoTokenizer.from_pretrained(model_name, token=hf_token)
    model = AutoModelForCausalLM.from_pretrained(
        model_name,
        token=hf_token,
        torch_dtype=torch.float16,
        device_map="auto",
    )

    pipe = pipeline(
        "text-generation",
        model=model,
        tokenizer=tokenizer,
        torch_dtype=torch.float16,
        device_map="auto",
    )

    results = []
    for prompt in params["prompts"]:
        print(f"Prompt: {prompt}")
        output = pipe(prompt, max_length=params["max_length"], num_return_sequences=1)
        response = output[0]["generated_text"]
        print(f"Response: {response}")
        results.append({"prompt": prompt, "response": response})

    with open(params["results_file"], "w") as f:
        json.dump(results, f, indent=2)

    print("Inference complete")


if __name__ == "__main__":
    main()
"##;
