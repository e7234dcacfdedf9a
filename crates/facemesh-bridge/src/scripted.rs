//! In-process graph engine that replays scripted results.
//!
//! `ScriptedEngine` stands in for MediaPipe wherever the native library is
//! not wanted: tests, and callers exercising the boundary without assets.
//! Each processed frame consumes the next scripted response; a batch only
//! reaches the output queue once the instance is drained, the same order
//! the real engine exposes. Every call is recorded as a [`ScriptEvent`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BridgeError, Result};
use crate::graph::{GraphBuilder, GraphEngine, GraphInstance, LandmarkPacket, OutputPoller};
use crate::resource::AssetRoot;
use crate::types::{Frame, Landmark, SidePacket};

type Batch = Vec<Vec<Landmark>>;

/// Engine call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    SetResourceDir,
    CreateBuilder,
    Build,
    CreatePoller,
    Start,
    Process,
    WaitUntilIdle,
    Poll,
}

/// Something the bridge asked the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    ResourceDir(PathBuf),
    BuilderCreated { graph: PathBuf, input_stream: String },
    OptionFloat { node: String, option: String, value: f32 },
    SidePacket { name: String, packet: SidePacket },
    InstanceBuilt,
    PollerCreated(String),
    Started,
    FrameProcessed { width: u32, height: u32, len: usize },
    Drained,
    Polled,
    PacketReleased,
    PollerDestroyed,
    InstanceDestroyed,
}

#[derive(Debug, Default)]
struct ScriptState {
    events: Vec<ScriptEvent>,
    responses: VecDeque<Option<Batch>>,
    fail_at: Option<FailPoint>,
    live_instances: usize,
    live_pollers: usize,
    live_packets: usize,
}

impl ScriptState {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_at == Some(point) {
            return Err(BridgeError::engine(
                stage_name(point),
                "scripted failure",
            ));
        }
        Ok(())
    }
}

fn stage_name(point: FailPoint) -> &'static str {
    match point {
        FailPoint::SetResourceDir => "set resource dir",
        FailPoint::CreateBuilder => "create instance builder",
        FailPoint::Build => "create instance",
        FailPoint::CreatePoller => "create poller",
        FailPoint::Start => "start graph",
        FailPoint::Process => "process frame",
        FailPoint::WaitUntilIdle => "wait until idle",
        FailPoint::Poll => "poll packet",
    }
}

/// Scripted [`GraphEngine`]. Clones share the same script, records and
/// asset root, the way every native engine shares the process-wide one.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    state: Arc<Mutex<ScriptState>>,
    root: Arc<AssetRoot>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next processed frame produces `faces` as its result batch.
    pub fn push_batch(&self, faces: Vec<Vec<Landmark>>) {
        self.state.lock().responses.push_back(Some(faces));
    }

    /// The next processed frame produces no output packet.
    pub fn push_no_result(&self) {
        self.state.lock().responses.push_back(None);
    }

    /// Make `point` fail until [`clear_failure`](Self::clear_failure).
    pub fn fail_at(&self, point: FailPoint) {
        self.state.lock().fail_at = Some(point);
    }

    pub fn clear_failure(&self) {
        self.state.lock().fail_at = None;
    }

    pub fn events(&self) -> Vec<ScriptEvent> {
        self.state.lock().events.clone()
    }

    pub fn resource_dirs(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                ScriptEvent::ResourceDir(dir) => Some(dir.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn frames_processed(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, ScriptEvent::FrameProcessed { .. }))
            .count()
    }

    pub fn live_instances(&self) -> usize {
        self.state.lock().live_instances
    }

    pub fn live_pollers(&self) -> usize {
        self.state.lock().live_pollers
    }

    pub fn live_packets(&self) -> usize {
        self.state.lock().live_packets
    }

    fn record(&self, event: ScriptEvent) {
        self.state.lock().events.push(event);
    }
}

impl GraphEngine for ScriptedEngine {
    fn set_resource_dir(&self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.check(FailPoint::SetResourceDir)?;
        state.events.push(ScriptEvent::ResourceDir(dir.to_path_buf()));
        Ok(())
    }

    fn create_builder(
        &self,
        graph_path: &Path,
        input_stream: &str,
    ) -> Result<Box<dyn GraphBuilder>> {
        let mut state = self.state.lock();
        state.check(FailPoint::CreateBuilder)?;
        state.events.push(ScriptEvent::BuilderCreated {
            graph: graph_path.to_path_buf(),
            input_stream: input_stream.to_string(),
        });
        Ok(Box::new(ScriptedBuilder {
            engine: self.clone(),
        }))
    }

    fn asset_root(&self) -> Arc<AssetRoot> {
        Arc::clone(&self.root)
    }
}

struct ScriptedBuilder {
    engine: ScriptedEngine,
}

impl GraphBuilder for ScriptedBuilder {
    fn add_option_float(&mut self, node: &str, option: &str, value: f32) -> Result<()> {
        self.engine.record(ScriptEvent::OptionFloat {
            node: node.to_string(),
            option: option.to_string(),
            value,
        });
        Ok(())
    }

    fn add_side_packet(&mut self, name: &str, packet: SidePacket) -> Result<()> {
        self.engine.record(ScriptEvent::SidePacket {
            name: name.to_string(),
            packet,
        });
        Ok(())
    }

    fn build(self: Box<Self>) -> Result<Box<dyn GraphInstance>> {
        {
            let mut state = self.engine.state.lock();
            state.check(FailPoint::Build)?;
            state.events.push(ScriptEvent::InstanceBuilt);
            state.live_instances += 1;
        }
        Ok(Box::new(ScriptedInstance {
            engine: self.engine,
            pending: Vec::new(),
            outputs: Arc::new(Mutex::new(VecDeque::new())),
        }))
    }
}

struct ScriptedInstance {
    engine: ScriptedEngine,
    pending: Vec<Batch>,
    outputs: Arc<Mutex<VecDeque<Batch>>>,
}

impl GraphInstance for ScriptedInstance {
    fn create_poller(&mut self, output_stream: &str) -> Result<Box<dyn OutputPoller>> {
        let mut state = self.engine.state.lock();
        state.check(FailPoint::CreatePoller)?;
        state
            .events
            .push(ScriptEvent::PollerCreated(output_stream.to_string()));
        state.live_pollers += 1;
        Ok(Box::new(ScriptedPoller {
            engine: self.engine.clone(),
            outputs: Arc::clone(&self.outputs),
        }))
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.engine.state.lock();
        state.check(FailPoint::Start)?;
        state.events.push(ScriptEvent::Started);
        Ok(())
    }

    fn process(&mut self, frame: &Frame<'_>) -> Result<()> {
        let mut state = self.engine.state.lock();
        state.check(FailPoint::Process)?;
        state.events.push(ScriptEvent::FrameProcessed {
            width: frame.width,
            height: frame.height,
            len: frame.pixels.len(),
        });
        if let Some(Some(batch)) = state.responses.pop_front() {
            self.pending.push(batch);
        }
        Ok(())
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        let mut state = self.engine.state.lock();
        state.check(FailPoint::WaitUntilIdle)?;
        state.events.push(ScriptEvent::Drained);
        self.outputs.lock().extend(self.pending.drain(..));
        Ok(())
    }
}

impl Drop for ScriptedInstance {
    fn drop(&mut self) {
        let mut state = self.engine.state.lock();
        state.live_instances -= 1;
        state.events.push(ScriptEvent::InstanceDestroyed);
    }
}

struct ScriptedPoller {
    engine: ScriptedEngine,
    outputs: Arc<Mutex<VecDeque<Batch>>>,
}

impl OutputPoller for ScriptedPoller {
    fn queue_size(&self) -> usize {
        self.outputs.lock().len()
    }

    fn poll(&mut self) -> Result<Box<dyn LandmarkPacket>> {
        let mut state = self.engine.state.lock();
        state.check(FailPoint::Poll)?;
        let faces = self
            .outputs
            .lock()
            .pop_front()
            .ok_or_else(|| BridgeError::engine("poll packet", "output queue is empty"))?;
        state.events.push(ScriptEvent::Polled);
        state.live_packets += 1;
        Ok(Box::new(ScriptedPacket {
            engine: self.engine.clone(),
            faces,
        }))
    }
}

impl Drop for ScriptedPoller {
    fn drop(&mut self) {
        let mut state = self.engine.state.lock();
        state.live_pollers -= 1;
        state.events.push(ScriptEvent::PollerDestroyed);
    }
}

struct ScriptedPacket {
    engine: ScriptedEngine,
    faces: Batch,
}

impl LandmarkPacket for ScriptedPacket {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face(&self, index: usize) -> &[Landmark] {
        &self.faces[index]
    }
}

impl Drop for ScriptedPacket {
    fn drop(&mut self) {
        let mut state = self.engine.state.lock();
        state.live_packets -= 1;
        state.events.push(ScriptEvent::PacketReleased);
    }
}
