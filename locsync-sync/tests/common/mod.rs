//! Shared fixtures: a scripted in-memory translator and project builder.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use locsync_core::{BatchRequest, Config};
use locsync_translate::{TranslateError, Translator, TranslatorContext, TranslatorFactory};
use tempfile::TempDir;

/// What the mock backend should get wrong.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Every call fails.
    pub fail_all: bool,
    /// Every call for this target language fails.
    pub fail_language: Option<String>,
    /// Batch calls containing this key fail.
    pub fail_batch_with_key: Option<String>,
    /// Batch replies silently drop this key.
    pub omit_key: Option<String>,
    /// Individual calls for this source text fail.
    pub fail_text: Option<String>,
    /// Batch calls never complete.
    pub hang: bool,
}

#[derive(Debug, Default)]
pub struct CallLog {
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub contexts: Mutex<Vec<TranslatorContext>>,
}

impl CallLog {
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.batch_calls() + self.single_calls()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub script: Script,
    pub log: Arc<CallLog>,
}

impl MockFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self::new(Script {
            fail_all: true,
            ..Script::default()
        })
    }

    pub fn shared(&self) -> Arc<dyn TranslatorFactory> {
        Arc::new(self.clone())
    }
}

impl TranslatorFactory for MockFactory {
    fn create(&self, context: TranslatorContext) -> Result<Arc<dyn Translator>, TranslateError> {
        self.log.contexts.lock().unwrap().push(context.clone());
        Ok(Arc::new(MockTranslator {
            language: context.target_language,
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// The translation every backend call agrees on.
pub fn expected(text: &str, language: &str) -> String {
    format!("{text} [{language}]")
}

struct MockTranslator {
    language: String,
    script: Script,
    log: Arc<CallLog>,
}

impl MockTranslator {
    fn language_fails(&self) -> bool {
        self.script.fail_all || self.script.fail_language.as_deref() == Some(self.language.as_str())
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _description: &str) -> Result<String, TranslateError> {
        self.log.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.language_fails() || self.script.fail_text.as_deref() == Some(text) {
            return Err(TranslateError::Backend("scripted failure".into()));
        }
        // Same contract as the chat backend: an empty reply is rejected.
        if text.trim().is_empty() {
            return Err(TranslateError::InvalidResponse("empty translation".into()));
        }
        Ok(expected(text, &self.language))
    }

    async fn translate_batch(
        &self,
        requests: &[BatchRequest],
    ) -> Result<HashMap<String, String>, TranslateError> {
        self.log.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.log.batch_sizes.lock().unwrap().push(requests.len());
        if self.script.hang {
            std::future::pending::<()>().await;
        }
        let poisoned = self
            .script
            .fail_batch_with_key
            .as_ref()
            .is_some_and(|key| requests.iter().any(|r| &r.key == key));
        if self.language_fails() || poisoned {
            return Err(TranslateError::Backend("scripted batch failure".into()));
        }
        Ok(requests
            .iter()
            .filter(|r| Some(&r.key) != self.script.omit_key.as_ref())
            .map(|r| {
                let text = if r.text.trim().is_empty() {
                    String::new()
                } else {
                    expected(&r.text, &self.language)
                };
                (r.key.clone(), text)
            })
            .collect())
    }
}

/// A throwaway project directory with a `locsync.yaml`.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write fixture");
        self
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn config(&self, yaml: &str) -> Arc<Config> {
        self.write("locsync.yaml", yaml);
        Arc::new(Config::load(&self.path("locsync.yaml")).expect("config"))
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Source CSV with keys `k00..k{n-1}`.
pub fn numbered_source(n: usize) -> String {
    let mut csv = String::from("key,text,description\n");
    for i in 0..n {
        csv.push_str(&format!("k{i:02},Text {i},\n"));
    }
    csv
}
