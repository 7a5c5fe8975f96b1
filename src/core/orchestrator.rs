//! 生成编排器：驱动阶段状态机
//!
//! generate：idle → analyzing → connecting → generating → rendering → complete，
//! 任一生成调用失败都先进入 error（展示文案），再用确定性离线内容替代并继续走到 rendering。
//! evolve：complete → evolving → {complete | error}，失败时保留上一次良好渲染。
//!
//! 同一时刻只允许一个周期（busy 标志）；cancel() 通过与周期绑定的 CancellationToken 终止当前周期。
//! 共享状态（渲染器、当前 Agent、历史）用异步锁保护，锁从不跨生成器调用持有。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures_util::future::join3;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, ContextUpdate};
use crate::config::AppConfig;
use crate::core::history::{HistoryKind, HistoryLog, HistoryRecord, ResultSnapshot};
use crate::core::state::{GenerationPhase, PhaseKind};
use crate::core::{ForgeError, RecoveryEngine};
use crate::fallback::build_fallback;
use crate::generator::Generator;
use crate::intent::{extract_intent, offline_intent, prompts, Intent};
use crate::preview::{
    DeviceFrame, FramedView, PreviewProps, PreviewRenderer, RenderOutcome, RenderPhase, RenderStatus,
};
use crate::synthesis::ComponentSynthesizer;

/// 业务逻辑生成失败时的离线说明
pub const OFFLINE_BUSINESS_LOGIC: &str = "Offline mode: business rules could not be generated.";
/// 模拟后端生成失败时的离线说明
pub const OFFLINE_BACKEND: &str = "Offline mode: simulated backend could not be generated.";

pub type PhaseCallback = Arc<dyn Fn(&GenerationPhase) + Send + Sync>;
pub type HistoryCallback = Arc<dyn Fn(&HistoryRecord) + Send + Sync>;

/// 宿主回调
#[derive(Clone, Default)]
pub struct OrchestratorCallbacks {
    pub on_phase_change: Option<PhaseCallback>,
    pub on_history_append: Option<HistoryCallback>,
}

impl OrchestratorCallbacks {
    pub fn on_phase_change(mut self, f: impl Fn(&GenerationPhase) + Send + Sync + 'static) -> Self {
        self.on_phase_change = Some(Arc::new(f));
        self
    }

    pub fn on_history_append(mut self, f: impl Fn(&HistoryRecord) + Send + Sync + 'static) -> Self {
        self.on_history_append = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for OrchestratorCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorCallbacks")
            .field("on_phase_change", &self.on_phase_change.is_some())
            .field("on_history_append", &self.on_history_append.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// 阶段之间的展示延迟
    pub phase_delay: Duration,
    pub evolution_directive: String,
    pub device: DeviceFrame,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl OrchestratorOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            phase_delay: Duration::from_millis(cfg.orchestrator.phase_delay_ms),
            evolution_directive: cfg.orchestrator.evolution_directive.clone(),
            device: cfg.app.device,
        }
    }
}

/// 一个周期的结果
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub phase: GenerationPhase,
    pub render: Option<RenderOutcome>,
    pub record: Option<Arc<HistoryRecord>>,
    /// 被离线替代吸收掉的错误
    pub degraded: Vec<ForgeError>,
}

/// busy 标志的 RAII 守卫
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct GenerationOrchestrator {
    generator: Arc<dyn Generator>,
    renderer: Mutex<PreviewRenderer>,
    agent: RwLock<Option<Agent>>,
    history: RwLock<HistoryLog>,
    phase_tx: watch::Sender<GenerationPhase>,
    busy: AtomicBool,
    cycle_token: StdMutex<CancellationToken>,
    recovery: RecoveryEngine,
    callbacks: OrchestratorCallbacks,
    options: OrchestratorOptions,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self::with_options(generator, OrchestratorOptions::default())
    }

    pub fn with_options(generator: Arc<dyn Generator>, options: OrchestratorOptions) -> Self {
        let (phase_tx, _) = watch::channel(GenerationPhase::default());
        Self {
            generator,
            renderer: Mutex::new(PreviewRenderer::default().with_device(options.device)),
            agent: RwLock::new(None),
            history: RwLock::new(HistoryLog::new()),
            phase_tx,
            busy: AtomicBool::new(false),
            cycle_token: StdMutex::new(CancellationToken::new()),
            recovery: RecoveryEngine::new(),
            callbacks: OrchestratorCallbacks::default(),
            options,
        }
    }

    pub fn from_config(cfg: &AppConfig, generator: Arc<dyn Generator>) -> Self {
        Self::with_options(generator, OrchestratorOptions::from_config(cfg))
    }

    pub fn with_callbacks(mut self, callbacks: OrchestratorCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// 替换合成实现（默认 SandboxSynthesizer）
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn ComponentSynthesizer>) -> Self {
        self.renderer = Mutex::new(PreviewRenderer::new(synthesizer).with_device(self.options.device));
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn phase(&self) -> GenerationPhase {
        self.phase_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationPhase> {
        self.phase_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn history(&self) -> Vec<Arc<HistoryRecord>> {
        self.history.read().await.records().to_vec()
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn current_agent(&self) -> Option<Agent> {
        self.agent.read().await.clone()
    }

    pub async fn current_source(&self) -> Option<String> {
        let renderer = self.renderer.lock().await;
        renderer.current().map(|c| c.source().to_string())
    }

    pub async fn render_status(&self) -> RenderStatus {
        self.renderer.lock().await.status().clone()
    }

    /// 切换设备框，只重绘
    pub async fn set_device(&self, device: DeviceFrame) -> Option<FramedView> {
        self.renderer.lock().await.set_device(device)
    }

    /// 取消当前周期；空闲时无效果
    pub fn cancel(&self) {
        let token = self.cycle_token.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_busy() {
            tracing::info!("Cancelling in-flight cycle");
            token.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Cycles
    // ------------------------------------------------------------------

    /// 从自然语言提示生成界面
    pub async fn generate(&self, prompt: &str) -> Result<CycleReport, ForgeError> {
        let (_guard, token) = self.acquire()?;

        let result = tokio::select! {
            biased;
            report = self.run_generation(prompt) => Ok(report),
            _ = token.cancelled() => Err(ForgeError::Cancelled),
        };
        if let Err(e) = &result {
            self.set_phase(PhaseKind::Error, self.recovery.user_message(e));
        }
        result
    }

    /// 用固定指令进化当前界面
    pub async fn evolve(&self) -> Result<CycleReport, ForgeError> {
        let (_guard, token) = self.acquire()?;
        if !self.phase().kind.can_transition_to(PhaseKind::Evolving) {
            return Err(ForgeError::NothingToEvolve);
        }
        let Some(current_source) = self.current_source().await else {
            return Err(ForgeError::NothingToEvolve);
        };
        let result = tokio::select! {
            biased;
            r = self.run_evolution(&current_source) => r,
            _ = token.cancelled() => Err(ForgeError::Cancelled),
        };
        if let Err(e) = &result {
            self.set_phase(PhaseKind::Error, self.recovery.user_message(e));
        }
        result
    }

    async fn run_generation(&self, prompt: &str) -> CycleReport {
        let mut degraded = Vec::new();

        self.set_phase(PhaseKind::Analyzing, "Analyzing intent...");
        self.pause().await;

        self.set_phase(PhaseKind::Connecting, "Connecting to generator...");
        let intent = match self.call(&prompts::intent_prompt(prompt)).await.and_then(|reply| extract_intent(&reply)) {
            Ok(intent) => intent,
            Err(e) => {
                self.degrade(&e);
                degraded.push(e);
                offline_intent(prompt)
            }
        };
        tracing::info!(name = %intent.display_name(), "Intent resolved");
        *self.agent.write().await = Some(Agent::create(intent.clone(), prompt));
        self.pause().await;

        self.set_phase(PhaseKind::Generating, "Generating interface, business logic and backend...");
        let ui_prompt = prompts::ui_prompt(&intent);
        let logic_prompt = prompts::business_logic_prompt(&intent);
        let backend_prompt = prompts::backend_prompt(&intent);
        let (ui, logic, backend) = join3(
            self.call(&ui_prompt),
            self.call(&logic_prompt),
            self.call(&backend_prompt),
        )
        .await;

        let failures: Vec<ForgeError> = [&ui, &logic, &backend]
            .into_iter()
            .filter_map(|r| r.as_ref().err().cloned())
            .collect();
        if let Some(first) = failures.first() {
            self.degrade(first);
        }
        degraded.extend(failures);

        // UI 生成失败：空源码交给渲染器，由它按 Intent 装上回退组件
        let (ui_source, generated_ui) = match ui {
            Ok(source) => (source.clone(), source),
            Err(_) => (String::new(), build_fallback(&intent).source().to_string()),
        };
        let business_logic = logic.unwrap_or_else(|_| OFFLINE_BUSINESS_LOGIC.to_string());
        let simulated_backend = backend.unwrap_or_else(|_| OFFLINE_BACKEND.to_string());
        self.update_agent(ContextUpdate {
            business_logic: Some(business_logic),
            simulated_backend: Some(simulated_backend),
            generated_ui: Some(generated_ui),
        })
        .await;
        self.pause().await;

        self.set_phase(PhaseKind::Rendering, "Rendering preview...");
        let (outcome, source) = {
            let mut renderer = self.renderer.lock().await;
            let props = PreviewProps {
                source: ui_source,
                intent: Some(intent.clone()),
                device: renderer.device(),
            };
            let outcome = renderer.render(&props);
            let source = renderer.current().map(|c| c.source().to_string());
            (outcome, source)
        };

        if outcome.status.phase != RenderPhase::Rendered {
            self.set_phase(
                PhaseKind::Error,
                outcome
                    .status
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Render failed".to_string()),
            );
            return CycleReport {
                phase: self.phase(),
                render: Some(outcome),
                record: None,
                degraded,
            };
        }

        let record = self
            .complete(HistoryKind::Generation, intent, &outcome, source.unwrap_or_default(), "Generation complete")
            .await;
        CycleReport {
            phase: self.phase(),
            render: Some(outcome),
            record: Some(record),
            degraded,
        }
    }

    async fn run_evolution(&self, current_source: &str) -> Result<CycleReport, ForgeError> {
        self.set_phase(PhaseKind::Evolving, "Evolving application...");
        let prompt = prompts::evolve_prompt(current_source, &self.options.evolution_directive);
        let reply = self
            .call(&prompt)
            .await
            .map_err(|e| ForgeError::EvolutionFailed(e.to_string()))?;

        let (outcome, source) = {
            let mut renderer = self.renderer.lock().await;
            let outcome = renderer
                .try_install(&reply)
                .map_err(|e| ForgeError::EvolutionFailed(e.to_string()))?;
            let source = renderer.current().map(|c| c.source().to_string());
            (outcome, source)
        };
        if outcome.status.phase != RenderPhase::Rendered {
            return Err(ForgeError::EvolutionFailed("evolved component failed to paint".to_string()));
        }
        let source = source.unwrap_or_default();
        self.update_agent(ContextUpdate {
            generated_ui: Some(source.clone()),
            ..ContextUpdate::default()
        })
        .await;

        let intent = self
            .agent
            .read()
            .await
            .as_ref()
            .map(|a| a.raw_intent.clone())
            .unwrap_or_default();
        let record = self
            .complete(HistoryKind::Evolution, intent, &outcome, source, "Evolution complete")
            .await;
        Ok(CycleReport {
            phase: self.phase(),
            render: Some(outcome),
            record: Some(record),
            degraded: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// 置 busy 并装上本周期的取消令牌；两步都在令牌锁内完成，cancel() 不会落到旧令牌上
    fn acquire(&self) -> Result<(BusyGuard<'_>, CancellationToken), ForgeError> {
        let mut slot = self.cycle_token.lock().unwrap_or_else(PoisonError::into_inner);
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                tracing::debug!("Trigger rejected, cycle in flight");
                ForgeError::Busy
            })?;
        let token = CancellationToken::new();
        *slot = token.clone();
        Ok((BusyGuard(&self.busy), token))
    }

    async fn call(&self, prompt: &str) -> Result<String, ForgeError> {
        self.generator.generate(prompt).await.map_err(|e| {
            tracing::warn!(generator = self.generator.name(), "Generator call failed: {}", e);
            ForgeError::from(e)
        })
    }

    async fn pause(&self) {
        if !self.options.phase_delay.is_zero() {
            tokio::time::sleep(self.options.phase_delay).await;
        }
    }

    /// 进入 error 展示失败原因；流程由调用方继续
    fn degrade(&self, err: &ForgeError) {
        tracing::warn!(action = ?self.recovery.handle(err), "Degrading: {}", err);
        self.set_phase(PhaseKind::Error, self.recovery.user_message(err));
    }

    async fn update_agent(&self, update: ContextUpdate) {
        let mut slot = self.agent.write().await;
        if let Some(agent) = slot.as_ref() {
            *slot = Some(agent.with_context(update));
        }
    }

    /// 追加历史并进入 complete；两步之间没有挂起点
    async fn complete(
        &self,
        kind: HistoryKind,
        intent: Intent,
        outcome: &RenderOutcome,
        source: String,
        message: &str,
    ) -> Arc<HistoryRecord> {
        let snapshot = ResultSnapshot {
            source,
            markup: outcome.view.as_ref().map(|v| v.view.to_markup()),
            origin: outcome.origin.map(|o| o.to_string()).unwrap_or_default(),
        };
        let mut history = self.history.write().await;
        let record = history.append(HistoryRecord::new(kind, intent, snapshot));
        drop(history);

        tracing::info!(id = %record.id, kind = ?record.kind, "History record appended");
        if let Some(cb) = &self.callbacks.on_history_append {
            cb(&record);
        }
        self.set_phase(PhaseKind::Complete, message);
        record
    }

    fn set_phase(&self, kind: PhaseKind, message: impl Into<String>) {
        let current = self.phase_tx.borrow().kind;
        // error 内只更新文案
        let refresh_error = current == PhaseKind::Error && kind == PhaseKind::Error;
        if !refresh_error && !current.can_transition_to(kind) {
            tracing::warn!("Rejected phase transition {} -> {}", current, kind);
            return;
        }
        let phase = GenerationPhase::new(kind, message);
        tracing::info!(phase = %phase.kind, "{}", phase.message);
        self.phase_tx.send_replace(phase.clone());
        if let Some(cb) = &self.callbacks.on_phase_change {
            cb(&phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorError, MockGenerator};
    use crate::synthesis::Origin;

    const INTENT_JSON: &str = r#"{"name": "Budget Buddy", "features": ["Expense tracking"], "components": ["Ledger"]}"#;
    const UI_SOURCE: &str = "```jsx\nconst GeneratedApp = () => <h1>Budget Buddy</h1>;\nexport default GeneratedApp;\n```";

    fn fast() -> OrchestratorOptions {
        OrchestratorOptions {
            phase_delay: Duration::ZERO,
            ..OrchestratorOptions::default()
        }
    }

    fn scripted() -> MockGenerator {
        MockGenerator::new()
            .on_prompt_containing("Return ONLY a JSON object", Ok(INTENT_JSON.into()))
            .on_prompt_containing("Generate ONLY executable React code", Ok(UI_SOURCE.into()))
            .on_prompt_containing("business rules", Ok("- rule".into()))
            .on_prompt_containing("REST endpoints", Ok("GET /expenses - list".into()))
    }

    #[tokio::test]
    async fn test_generation_happy_path() {
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(scripted()), fast());
        let report = orchestrator.generate("budget app").await.unwrap();

        assert_eq!(report.phase.kind, PhaseKind::Complete);
        assert!(report.degraded.is_empty());
        let render = report.render.unwrap();
        assert_eq!(render.origin, Some(Origin::Synthesized));
        assert_eq!(render.view.unwrap().view.to_markup(), "<h1>Budget Buddy</h1>");

        let agent = orchestrator.current_agent().await.unwrap();
        assert_eq!(agent.raw_intent.name, "Budget Buddy");
        assert_eq!(agent.context.business_logic, "- rule");
        assert_eq!(orchestrator.history_len().await, 1);
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_generator_failure_degrades_to_fallback() {
        let mock = MockGenerator::new()
            .on_prompt_containing("Return ONLY a JSON object", Ok(INTENT_JSON.into()))
            .on_prompt_containing(
                "Generate ONLY executable React code",
                Err(GeneratorError::Status {
                    status: 503,
                    message: "unavailable".into(),
                }),
            );
        let phases = Arc::new(StdMutex::new(Vec::new()));
        let seen = phases.clone();
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(mock), fast()).with_callbacks(
            OrchestratorCallbacks::default().on_phase_change(move |p| {
                seen.lock().unwrap().push(p.kind);
            }),
        );

        let report = orchestrator.generate("budget app").await.unwrap();
        assert_eq!(report.phase.kind, PhaseKind::Complete);
        assert_eq!(report.degraded.len(), 1);
        assert_eq!(
            report.render.unwrap().origin,
            Some(Origin::Fallback(crate::fallback::Category::Finance))
        );
        assert_eq!(
            phases.lock().unwrap().as_slice(),
            &[
                PhaseKind::Analyzing,
                PhaseKind::Connecting,
                PhaseKind::Generating,
                PhaseKind::Error,
                PhaseKind::Rendering,
                PhaseKind::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_evolve_requires_prior_generation() {
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(scripted()), fast());
        assert_eq!(orchestrator.evolve().await.unwrap_err(), ForgeError::NothingToEvolve);
        assert_eq!(orchestrator.phase().kind, PhaseKind::Idle);
    }

    #[tokio::test]
    async fn test_cancel_during_degraded_error_updates_message() {
        let mock = MockGenerator::new().on_prompt_containing(
            "Return ONLY a JSON object",
            Err(GeneratorError::Status {
                status: 500,
                message: "boom".into(),
            }),
        );
        let options = OrchestratorOptions {
            phase_delay: Duration::from_millis(200),
            ..OrchestratorOptions::default()
        };
        let orchestrator = Arc::new(GenerationOrchestrator::with_options(Arc::new(mock), options));

        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate("notes app").await })
        };
        while orchestrator.phase().kind != PhaseKind::Error {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(orchestrator.phase().message.contains("HTTP 500"));
        orchestrator.cancel();

        assert_eq!(running.await.unwrap().unwrap_err(), ForgeError::Cancelled);
        let phase = orchestrator.phase();
        assert_eq!(phase.kind, PhaseKind::Error);
        assert_eq!(phase.message, "Generation cancelled");
        assert_eq!(orchestrator.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_right_after_trigger_hits_new_cycle() {
        let options = OrchestratorOptions {
            phase_delay: Duration::from_millis(200),
            ..OrchestratorOptions::default()
        };
        let orchestrator = Arc::new(GenerationOrchestrator::with_options(Arc::new(scripted()), options));
        // 空闲时取消没有效果，也不会影响之后的周期
        orchestrator.cancel();

        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate("budget app").await })
        };
        while !orchestrator.is_busy() {
            tokio::task::yield_now().await;
        }
        orchestrator.cancel();

        assert_eq!(running.await.unwrap().unwrap_err(), ForgeError::Cancelled);
        assert!(!orchestrator.is_busy());
    }
}
