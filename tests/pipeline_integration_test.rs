//! 生成管线集成测试：编排器 + Mock 生成器 + 预览渲染器 + 回退库

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use darwin_forge::core::{
        ForgeError, GenerationOrchestrator, HistoryKind, OrchestratorCallbacks, OrchestratorOptions,
        PhaseKind,
    };
    use darwin_forge::fallback::Category;
    use darwin_forge::generator::{GeneratorError, MockGenerator};
    use darwin_forge::preview::{DeviceFrame, RenderPhase};
    use darwin_forge::synthesis::{Origin, SynthesisError};
    use tokio::sync::Semaphore;

    const INTENT_JSON: &str = r#"{"name": "Recipe Box", "features": ["Save recipes"], "components": ["RecipeList"], "estimated_complexity": 4}"#;

    const RECIPE_UI: &str = r#"```jsx
import React, { useState } from 'react';

const GeneratedApp = () => {
  const [recipes] = useState(['Soup', 'Bread']);
  return (
    <div className="p-6">
      <h1>Recipe Box</h1>
      <ul>{recipes.map(r => <li key={r}>{r}</li>)}</ul>
    </div>
  );
};

export default GeneratedApp;
```"#;

    const EVOLVED_UI: &str = r#"const GeneratedApp = () => {
  const [recipes] = useState(['Soup', 'Bread', 'Salad']);
  return (
    <div className="p-6">
      <h1>Recipe Box</h1>
      <p>{recipes.length} recipes</p>
    </div>
  );
};"#;

    fn fast() -> OrchestratorOptions {
        OrchestratorOptions {
            phase_delay: Duration::ZERO,
            ..OrchestratorOptions::default()
        }
    }

    fn recipe_generator() -> MockGenerator {
        MockGenerator::new()
            .on_prompt_containing("Return ONLY a JSON object", Ok(INTENT_JSON.into()))
            .on_prompt_containing("Generate ONLY executable React code", Ok(RECIPE_UI.into()))
    }

    #[tokio::test]
    async fn test_refusal_falls_back_to_productivity_template() {
        let mock = MockGenerator::new()
            .then_reply("I cannot comply.")
            .then_reply("I cannot comply.")
            .then_reply("I cannot comply.")
            .then_reply("I cannot comply.");
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(mock), fast());

        let report = orchestrator.generate("task dashboard with CRUD").await.unwrap();
        assert_eq!(report.phase.kind, PhaseKind::Complete);

        let render = report.render.unwrap();
        assert_eq!(render.synthesis_error, Some(SynthesisError::EmptySource));
        assert_eq!(render.origin, Some(Origin::Fallback(Category::Productivity)));

        let view = render.view.unwrap().view;
        assert!(view.text_content().contains("Task Dashboard"));
        assert!(view
            .find_by_tag("input")
            .iter()
            .any(|n| n.attr("type") == Some("checkbox")));

        let agent = orchestrator.current_agent().await.unwrap();
        assert_eq!(agent.raw_intent.name, "Task Dashboard");
        assert_eq!(agent.context.generated_ui, "I cannot comply.");
    }

    #[tokio::test]
    async fn test_phase_sequence_and_history_callback() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let appended = Arc::new(Mutex::new(Vec::new()));
        let (p, a) = (phases.clone(), appended.clone());
        let callbacks = OrchestratorCallbacks::default()
            .on_phase_change(move |phase| p.lock().unwrap().push(phase.kind))
            .on_history_append(move |record| a.lock().unwrap().push(record.id.clone()));
        let orchestrator =
            GenerationOrchestrator::with_options(Arc::new(recipe_generator()), fast()).with_callbacks(callbacks);
        let mut rx = orchestrator.subscribe();

        let report = orchestrator.generate("a recipe app").await.unwrap();
        assert_eq!(
            phases.lock().unwrap().as_slice(),
            &[
                PhaseKind::Analyzing,
                PhaseKind::Connecting,
                PhaseKind::Generating,
                PhaseKind::Rendering,
                PhaseKind::Complete,
            ]
        );
        assert_eq!(appended.lock().unwrap().as_slice(), &[report.record.unwrap().id.clone()]);
        assert_eq!(rx.borrow_and_update().kind, PhaseKind::Complete);

        let markup = report.render.unwrap().view.unwrap().view.to_markup();
        assert!(markup.contains("<li>Soup</li><li>Bread</li>"), "{}", markup);
    }

    #[tokio::test]
    async fn test_history_is_append_only_across_cycles() {
        let mock = recipe_generator().on_prompt_containing("Evolution request", Ok(EVOLVED_UI.into()));
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(mock), fast());

        orchestrator.generate("recipe app").await.unwrap();
        let first = orchestrator.history().await[0].as_ref().clone();

        let evolved = orchestrator.evolve().await.unwrap();
        assert_eq!(evolved.phase.kind, PhaseKind::Complete);
        orchestrator.generate("recipe app again").await.unwrap();

        let history = orchestrator.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(*history[0], first);
        assert_eq!(
            history.iter().map(|r| r.kind).collect::<Vec<_>>(),
            vec![HistoryKind::Generation, HistoryKind::Evolution, HistoryKind::Generation]
        );
        assert!(history[1].result_snapshot.markup.as_deref().unwrap().contains("3 recipes"));
    }

    #[tokio::test]
    async fn test_failed_evolution_keeps_last_good_render() {
        let mock = recipe_generator().on_prompt_containing(
            "Evolution request",
            Ok("Sorry, I can only describe the changes.".into()),
        );
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(mock), fast());
        orchestrator.generate("recipe app").await.unwrap();
        let before = orchestrator.current_source().await.unwrap();

        let err = orchestrator.evolve().await.unwrap_err();
        assert!(matches!(err, ForgeError::EvolutionFailed(_)));
        assert_eq!(orchestrator.phase().kind, PhaseKind::Error);
        assert_eq!(orchestrator.current_source().await.unwrap(), before);
        assert_eq!(orchestrator.render_status().await.phase, RenderPhase::Rendered);
        assert_eq!(orchestrator.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_evolution_generator_outage_keeps_last_good_render() {
        let mock = recipe_generator().on_prompt_containing(
            "Evolution request",
            Err(GeneratorError::Timeout(10_000)),
        );
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(mock), fast());
        orchestrator.generate("recipe app").await.unwrap();

        assert!(orchestrator.evolve().await.is_err());
        assert!(orchestrator.current_source().await.unwrap().contains("Recipe Box"));
        assert_eq!(orchestrator.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_second_trigger_rejected_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let mock = recipe_generator().with_gate(gate.clone());
        let orchestrator = Arc::new(GenerationOrchestrator::with_options(Arc::new(mock), fast()));

        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate("recipe app").await })
        };
        while !orchestrator.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(orchestrator.generate("other app").await.unwrap_err(), ForgeError::Busy);
        assert_eq!(orchestrator.evolve().await.unwrap_err(), ForgeError::Busy);

        gate.add_permits(16);
        let report = running.await.unwrap().unwrap();
        assert_eq!(report.phase.kind, PhaseKind::Complete);
        assert_eq!(orchestrator.history_len().await, 1);
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_cancel_ends_in_error_without_history() {
        let gate = Arc::new(Semaphore::new(0));
        let mock = recipe_generator().with_gate(gate.clone());
        let orchestrator = Arc::new(GenerationOrchestrator::with_options(Arc::new(mock), fast()));

        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate("recipe app").await })
        };
        while orchestrator.phase().kind != PhaseKind::Connecting {
            tokio::task::yield_now().await;
        }
        orchestrator.cancel();

        assert_eq!(running.await.unwrap().unwrap_err(), ForgeError::Cancelled);
        assert_eq!(orchestrator.phase().kind, PhaseKind::Error);
        assert_eq!(orchestrator.phase().message, "Generation cancelled");
        assert_eq!(orchestrator.history_len().await, 0);
        assert!(!orchestrator.is_busy());

        // 取消后可以立即开始新周期
        gate.add_permits(16);
        let report = orchestrator.generate("recipe app").await.unwrap();
        assert_eq!(report.phase.kind, PhaseKind::Complete);
    }

    #[tokio::test]
    async fn test_device_change_repaints_without_new_record() {
        let orchestrator = GenerationOrchestrator::with_options(Arc::new(recipe_generator()), fast());
        orchestrator.generate("recipe app").await.unwrap();

        let framed = orchestrator.set_device(DeviceFrame::Mobile).await.unwrap();
        assert_eq!(framed.device, DeviceFrame::Mobile);
        assert!(framed.to_markup().contains("w-64 h-96"));
        assert_eq!(orchestrator.history_len().await, 1);
        assert_eq!(orchestrator.phase().kind, PhaseKind::Complete);
    }
}
