#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cairn::config::CairnConfig;
use cairn::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use cairn::memory::types::{MemoryType, NewMemory};
use cairn::memory::MemoryService;
use cairn::store::InMemoryStore;

/// Bag-of-words embedder: every distinct word gets its own dimension, so the
/// cosine similarity of two texts is `shared / sqrt(words_a * words_b)` for
/// texts without repeated words.
#[derive(Default)]
pub struct WordEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl WordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for WordEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vocab = self.vocab.lock().unwrap();
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocab.len();
            let idx = *vocab.entry(word.to_lowercase()).or_insert(next);
            v[idx % EMBEDDING_DIM] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

/// Embedder returning a fixed vector regardless of input.
pub struct FixedEmbedder(pub Vec<f32>);

impl EmbeddingProvider for FixedEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

pub struct TestService {
    pub memory: MemoryService,
    pub store: Arc<InMemoryStore>,
    pub embedder: Arc<WordEmbedder>,
}

/// A memory service over an in-process store and the word embedder.
pub fn test_service() -> TestService {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(WordEmbedder::default());
    let memory = MemoryService::with_backends(
        Arc::new(CairnConfig::default()),
        embedder.clone(),
        store.clone(),
    );
    TestService {
        memory,
        store,
        embedder,
    }
}

pub fn new_memory(text: &str, scope: &str, memory_type: MemoryType) -> NewMemory {
    NewMemory {
        text: text.to_string(),
        scope: scope.to_string(),
        agent: "main".to_string(),
        memory_type,
        tags: Vec::new(),
    }
}
