//! 清洗与渲染的性质测试：由常见模型回复片段随机拼接输入

#[cfg(test)]
mod tests {
    use darwin_forge::intent::Intent;
    use darwin_forge::preview::{DeviceFrame, PreviewProps, PreviewRenderer, RenderPhase};
    use darwin_forge::synthesis::sanitize;
    use proptest::prelude::*;

    const FRAGMENTS: &[&str] = &[
        "\n",
        " ",
        "```",
        "```jsx\n",
        "`",
        "``",
        "import React from 'react';\n",
        "import {\n  useState,\n} from 'react';\n",
        "'use client';\n",
        "export ",
        "export default ",
        "export default GeneratedApp;\n",
        "export default () => <b>anon</b>;\n",
        "const GeneratedApp = () => <div>ok</div>;\n",
        "function GeneratedApp() {\n  return <p>fn</p>;\n}\n",
        "type Café = { id: number };\n",
        "interface Ünïcode { name: string }\n",
        "type Ω<T> = T[];\n",
        "<section>ñandú 🚀</section>",
        "<div>",
        "</div>",
        "{",
        "}",
        "return (",
        ");",
        "Here you go:\n",
        "I cannot comply.",
        "Enjoy!",
    ];

    /// 片段序列拼成的模型回复
    fn arb_reply() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(FRAGMENTS), 0..24).prop_map(|parts| parts.concat())
    }

    fn arb_intent() -> impl Strategy<Value = Intent> {
        prop_oneof![
            Just(Intent::default()),
            Just(Intent::named("Café dashboard")),
            Just(Intent::named("Sneaker shop")),
            Just(Intent::named("Team chat")),
            "[a-zA-Zé ]{0,40}".prop_map(Intent::named),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn sanitize_is_idempotent_and_strips_module_syntax(raw in arb_reply()) {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once.clone(), "input {:?}", raw);
            prop_assert!(!once.contains("```"), "fence left in {:?}", once);
            for line in once.lines() {
                let line = line.trim();
                prop_assert!(!line.starts_with("import "), "import left in {:?}", once);
                prop_assert!(!line.starts_with("export "), "export left in {:?}", once);
            }
        }

        #[test]
        fn any_reply_with_intent_renders(raw in arb_reply(), intent in arb_intent()) {
            let mut renderer = PreviewRenderer::default();
            let outcome = renderer.render(&PreviewProps {
                source: raw.clone(),
                intent: Some(intent),
                device: DeviceFrame::Desktop,
            });
            prop_assert_eq!(outcome.status.phase, RenderPhase::Rendered, "input {:?}", raw);
            prop_assert!(outcome.view.is_some());
        }
    }
}
