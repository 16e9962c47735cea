//! 多模块链接测试

mod common;

use std::path::Path;

use common::Sample;
use serde_json::json;
use wax_core::{EngineConfig, LimitConfig, Phase};
use wax_vfs::VirtualFileSystem;

const MODULE1: &str = r#"export default function SimpleDiv(p) { return <i>{p.title}</i> }
export function helper(p) { return <SimpleDiv title={p.title} /> }
"#;

fn render_with_module1(view: &str) -> String {
    Sample::new(&[("/View.jsx", view), ("/module1.jsx", MODULE1)])
        .render("View", json!(null))
        .unwrap()
}

#[test]
fn test_import_default() {
    let out = render_with_module1(
        r#"import SimpleDiv from "./module1.jsx";
        export function View() { return <SimpleDiv title="title" /> }"#,
    );
    assert_eq!(out, "<i>title</i>");
}

#[test]
fn test_import_without_extension() {
    let out = render_with_module1(
        r#"import SimpleDiv from "./module1";
        export function View() { return <SimpleDiv title="title" /> }"#,
    );
    assert_eq!(out, "<i>title</i>");
}

#[test]
fn test_import_namespace() {
    let out = render_with_module1(
        r#"import * as m from "./module1.jsx";
        export function View() { return <>{m.helper({ title: "title" })}</> }"#,
    );
    assert_eq!(out, "<i>title</i>");
}

#[test]
fn test_import_named_and_alias() {
    let out = render_with_module1(
        r#"import { helper as Helper, default as D } from "./module1.jsx";
        export function View() { return <div><Helper title="title" /><D title="d" /></div> }"#,
    );
    assert_eq!(out, "<div><i>title</i><i>d</i></div>");
}

#[test]
fn test_import_default_and_named() {
    let out = render_with_module1(
        r#"import SimpleDiv, { helper } from "./module1.jsx";
        export function View() { return <>{helper({ title: "a" })}<SimpleDiv title="b" /></> }"#,
    );
    assert_eq!(out, "<i>a</i><i>b</i>");
}

#[test]
fn test_import_used_before_declaration() {
    let out = render_with_module1(
        r#"export function View() { return <SimpleDiv title="title" /> }
        import SimpleDiv from "./module1.jsx";"#,
    );
    assert_eq!(out, "<i>title</i>");
}

#[test]
fn test_nested_directories() {
    let sample = Sample::new(&[
        (
            "/pages/View.jsx",
            r#"import { Layout } from "../shared/layout.jsx";
            export function View() { return <Layout><p>page</p></Layout> }"#,
        ),
        (
            "/shared/layout.jsx",
            r#"import { Footer } from "./footer.jsx";
            export function Layout({ children }) { return <main>{children}<Footer /></main> }"#,
        ),
        (
            "/shared/footer.jsx",
            "export function Footer() { return <footer>{module.meta.dirname}</footer> }",
        ),
    ]);
    let out = sample.render("pages/View", json!(null)).unwrap();
    assert_eq!(out, "<main><p>page</p><footer>/shared</footer></main>");
}

#[test]
fn test_reexport() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"import { SimpleDiv, helper } from "./index.jsx";
            export function View() { return <>{helper({ title: "h" })}<SimpleDiv title="s" /></> }"#,
        ),
        (
            "/index.jsx",
            r#"export { default as SimpleDiv } from "./module1.jsx";
            export * from "./module1.jsx";"#,
        ),
        ("/module1.jsx", MODULE1),
    ]);
    assert_eq!(
        sample.render("View", json!(null)).unwrap(),
        "<i>h</i><i>s</i>"
    );
}

#[test]
fn test_module_body_runs_once_per_render() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"import { next } from "./counter.jsx";
            import { twice } from "./twice.jsx";
            export function View() { return <p>{next()}{twice()}</p> }"#,
        ),
        (
            "/twice.jsx",
            r#"import { next } from "./counter.jsx";
            export function twice() { return next() }"#,
        ),
        (
            "/counter.jsx",
            "let n = 0;\nexport function next() { n++; return n }",
        ),
    ]);
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>12</p>");
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>12</p>");
}

#[test]
fn test_circular_import() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"import { ping } from "./ping.jsx";
            export function pong(n) { return n <= 0 ? "done" : ping(n - 1) }
            export function View() { return <p>{ping(3)}</p> }"#,
        ),
        (
            "/ping.jsx",
            r#"import { pong } from "./View.jsx";
            export function ping(n) { return pong(n) }"#,
        ),
    ]);
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>done</p>");
}

#[test]
fn test_top_level_bindings_survive_imports() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"const label = "n";
            let seen = [];
            import { next, step } from "./counter.jsx";
            const first = next();
            export function View() { seen.push(next()); return <p>{label}:{first}:{seen.join(",")}:{step}</p> }"#,
        ),
        (
            "/counter.jsx",
            "const step = 2;\nlet n = 0;\nexport function next() { n += step; return n }\nexport { step };",
        ),
    ]);
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>n:2:4:2</p>");
}

#[test]
fn test_circular_export_const() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"import { ping } from "./ping.jsx";
            export const pong = (n) => (n <= 0 ? "done" : ping(n - 1));
            export function View() { return <p>{ping(3)}</p> }"#,
        ),
        (
            "/ping.jsx",
            r#"import { pong } from "./View.jsx";
            export const ping = (n) => pong(n);"#,
        ),
    ]);
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>done</p>");
}

#[test]
fn test_view_found_by_last_segment() {
    let sample = Sample::new(&[
        ("/pages/Home.jsx", "export function Home() { return <h1>home</h1> }"),
        ("/pages/About.jsx", "export default function () { return <h1>about</h1> }"),
    ]);
    assert_eq!(sample.render("pages/Home", json!(null)).unwrap(), "<h1>home</h1>");
    assert_eq!(sample.render("pages/About", json!(null)).unwrap(), "<h1>about</h1>");
}

#[test]
fn test_unlinked_dynamic_import_fails() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"export function View() { const m = module.do_import("./late.jsx"); return <p>{m.exports.x}</p> }"#,
        ),
        ("/late.jsx", "export const x = 1;"),
    ]);
    let err = sample.render("View", json!(null)).unwrap_err();
    assert_eq!(err.phase, Phase::Load);
    assert_eq!(err.file.as_deref(), Some("/late.jsx"));
}

#[test]
fn test_imported_module_meta() {
    let sample = Sample::new(&[
        (
            "/View.jsx",
            r#"import { info } from "./lib/info.jsx";
            export function View() { return <p>{info()}</p> }"#,
        ),
        (
            "/lib/info.jsx",
            "export function info() { return `${module.meta.filename}:${module.meta.main}` }",
        ),
    ]);
    assert_eq!(
        sample.render("View", json!(null)).unwrap(),
        "<p>/lib/info.jsx:false</p>"
    );
}

#[test]
fn test_global_scripts() {
    let config = EngineConfig {
        global_scripts: vec!["./globals.jsx".to_string()],
        ..EngineConfig::default()
    };
    let sample = Sample::with_config(
        &[
            ("/View.jsx", "export function View() { return <p>{globalThis.siteName}</p> }"),
            ("/globals.jsx", "globalThis.siteName = \"wax\";"),
        ],
        config,
        Vec::new(),
    );
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>wax</p>");
}

#[test]
fn test_missing_global_script_fails_on_main() {
    let config = EngineConfig {
        global_scripts: vec!["./missing.jsx".to_string()],
        ..EngineConfig::default()
    };
    let sample = Sample::with_config(
        &[("/View.jsx", "export function View() { return <p /> }")],
        config,
        Vec::new(),
    );
    let err = sample.render("View", json!(null)).unwrap_err();
    assert_eq!(err.phase, Phase::Load);
    assert_eq!(err.file.as_deref(), Some("/View.jsx"));
}

#[test]
fn test_cache_hit_and_invalidation() {
    let sample = Sample::new(&[
        ("/View.jsx", r#"import { t } from "./t.jsx"; export function View() { return <p>{t}</p> }"#),
        ("/t.jsx", "export const t = 1;"),
    ]);
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>1</p>");
    assert_eq!(sample.linker.cache().compile_count(), 2);

    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>1</p>");
    assert_eq!(sample.linker.cache().compile_count(), 2);

    sample
        .fs
        .write_file(Path::new("/t.jsx"), b"export const t = 2;")
        .unwrap();
    assert_eq!(sample.render("View", json!(null)).unwrap(), "<p>2</p>");
    assert_eq!(sample.linker.cache().compile_count(), 3);
    assert_eq!(sample.linker.cache().len(), 3);
}

#[test]
fn test_import_depth_limit() {
    let config = EngineConfig {
        limits: LimitConfig { max_import_depth: 3 },
        ..EngineConfig::default()
    };
    let files = [
        ("/View.jsx", r#"import "./a.jsx"; export function View() { return <p /> }"#),
        ("/a.jsx", r#"import "./b.jsx";"#),
        ("/b.jsx", r#"import "./c.jsx";"#),
        ("/c.jsx", r#"import "./d.jsx";"#),
        ("/d.jsx", "export const d = 1;"),
    ];
    let sample = Sample::with_config(&files, config, Vec::new());
    let err = sample.render("View", json!(null)).unwrap_err();
    assert_eq!(err.phase, Phase::Execute);
    assert_eq!(err.message, "import depth limit exceeded");
    assert_eq!(err.file.as_deref(), Some("/c.jsx"));

    let sample = Sample::with_config(&files, EngineConfig::default(), Vec::new());
    assert!(sample.render("View", json!(null)).is_ok());
}
