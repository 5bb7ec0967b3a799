//! Shared test doubles.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::{AudioBackend, AudioElement, SoundSource};
use crate::cache::HandleDisposer;
use crate::error::{Error, Result};

/// Records released handles in release order.
#[derive(Debug, Default)]
pub struct CountingDisposer {
    released: Mutex<Vec<u32>>,
}

impl CountingDisposer {
    pub fn released(&self) -> Vec<u32> {
        self.released.lock().unwrap().clone()
    }
}

impl HandleDisposer<u32> for CountingDisposer {
    fn release(&self, handle: u32) {
        self.released.lock().unwrap().push(handle);
    }
}

/// Backend whose elements record calls and fail on demand.
#[derive(Default)]
pub struct MockBackend {
    elements: Mutex<HashMap<String, Arc<MockElement>>>,
    failing_locations: Mutex<HashSet<String>>,
    created: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_element` fail for `location`.
    pub fn fail_create(&self, location: &str) {
        self.failing_locations
            .lock()
            .unwrap()
            .insert(location.to_string());
    }

    pub fn element(&self, location: &str) -> Option<Arc<MockElement>> {
        self.elements.lock().unwrap().get(location).cloned()
    }

    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.elements.lock().unwrap().keys().cloned().collect();
        locations.sort();
        locations
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    async fn create_element(&self, source: &SoundSource) -> Result<Arc<dyn AudioElement>> {
        if self.failing_locations.lock().unwrap().contains(&source.location) {
            return Err(Error::AudioBackend(format!("cannot open {}", source.location)));
        }

        let element = Arc::new(MockElement::default());
        self.elements
            .lock()
            .unwrap()
            .insert(source.location.clone(), element.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(element)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Debug)]
pub struct MockElement {
    paused: AtomicBool,
    looping: AtomicBool,
    preloaded: AtomicBool,
    fail_play: AtomicBool,
    fail_pause: AtomicBool,
    plays: AtomicU32,
    pauses: AtomicU32,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            paused: AtomicBool::new(true),
            looping: AtomicBool::new(false),
            preloaded: AtomicBool::new(false),
            fail_play: AtomicBool::new(false),
            fail_pause: AtomicBool::new(false),
            plays: AtomicU32::new(0),
            pauses: AtomicU32::new(0),
        }
    }
}

impl MockElement {
    pub fn fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pause(&self, fail: bool) {
        self.fail_pause.store(fail, Ordering::SeqCst);
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded.load(Ordering::SeqCst)
    }

    pub fn play_count(&self) -> u32 {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> u32 {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioElement for MockElement {
    async fn preload(&self) -> Result<()> {
        self.preloaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self, looping: bool) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(Error::AudioBackend("injected play failure".to_string()));
        }
        self.looping.store(looping, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(Error::AudioBackend("injected pause failure".to_string()));
        }
        self.paused.store(true, Ordering::SeqCst);
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
