//! Integration tests for building kustomization roots through the public API.
//!
//! Most roots are staged in a `MemoryFS`; the on-disk tests at the end go
//! through `target::build` and a real temporary directory.

use kustomize::error::Error;
use kustomize::filesystem::{FileSystem, MemoryFS};
use kustomize::loader::FileLoader;
use kustomize::options::BuildOptions;
use kustomize::resmap::ResMap;
use kustomize::resource::Resource;
use kustomize::target::{self, KustTarget};
use serde_yaml::Value;
use std::sync::Arc;

fn target_at(files: &[(&str, &str)], root: &str) -> KustTarget {
    let mut fs = MemoryFS::new();
    for (path, content) in files {
        fs.add_file_string(path, content).unwrap();
    }
    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    let loader = FileLoader::new(fs, root).unwrap();
    KustTarget::new(loader, BuildOptions::default())
}

fn build(files: &[(&str, &str)], root: &str) -> Result<ResMap, Error> {
    let mut target = target_at(files, root);
    let mut map = target.make_customized_res_map()?;
    map.remove_build_annotations();
    Ok(map)
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

fn names(map: &ResMap) -> Vec<String> {
    map.iter().map(|r| r.name().to_string()).collect()
}

fn find<'a>(map: &'a ResMap, kind: &str) -> &'a Resource {
    map.iter()
        .find(|r| r.kind() == kind)
        .unwrap_or_else(|| panic!("no {} in output", kind))
}

const WHATEVER_KUSTOMIZATION: &str = "namePrefix: foo-
nameSuffix: -bar
namespace: ns1
commonLabels:
  app: nginx
commonAnnotations:
  note: This is a test annotation
resources:
- deployment.yaml
- namespace.yaml
configMapGenerator:
- name: literalConfigMap
  literals:
  - DB_USERNAME=admin
  - DB_PASSWORD=somepw
secretGenerator:
- name: secret
  literals:
  - DB_USERNAME=admin
  - DB_PASSWORD=somepw
  type: Opaque
patchesJson6902:
- target:
    group: apps
    version: v1
    kind: Deployment
    name: dply1
  path: jsonpatch.json
";

fn whatever_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/whatever/kustomization.yaml", WHATEVER_KUSTOMIZATION),
        (
            "/whatever/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: dply1\n",
        ),
        (
            "/whatever/namespace.yaml",
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: ns1\n",
        ),
        (
            "/whatever/jsonpatch.json",
            "[\n  {\"op\": \"add\", \"path\": \"/spec/replica\", \"value\": \"3\"}\n]\n",
        ),
    ]
}

#[test]
fn test_make_customized_res_map() {
    let map = build(&whatever_files(), "/whatever").unwrap();

    assert_eq!(
        names(&map),
        vec![
            "foo-dply1-bar",
            "ns1",
            "foo-literalConfigMap-bar-8d2dkb8k24",
            "foo-secret-bar-9btc7bt4kb"
        ]
    );

    let deployment = find(&map, "Deployment");
    assert_eq!(
        deployment.value(),
        &yaml(
            "apiVersion: apps/v1
kind: Deployment
metadata:
  name: foo-dply1-bar
  namespace: ns1
  labels:
    app: nginx
  annotations:
    note: This is a test annotation
spec:
  replica: \"3\"
  selector:
    matchLabels:
      app: nginx
  template:
    metadata:
      labels:
        app: nginx
      annotations:
        note: This is a test annotation
"
        )
    );

    let namespace = find(&map, "Namespace");
    assert_eq!(
        namespace.value(),
        &yaml(
            "apiVersion: v1
kind: Namespace
metadata:
  name: ns1
  labels:
    app: nginx
  annotations:
    note: This is a test annotation
"
        )
    );

    let config_map = find(&map, "ConfigMap");
    assert_eq!(
        config_map.value(),
        &yaml(
            "apiVersion: v1
kind: ConfigMap
metadata:
  name: foo-literalConfigMap-bar-8d2dkb8k24
  namespace: ns1
  labels:
    app: nginx
  annotations:
    note: This is a test annotation
data:
  DB_USERNAME: admin
  DB_PASSWORD: somepw
"
        )
    );

    let secret = find(&map, "Secret");
    assert_eq!(
        secret.value(),
        &yaml(
            "apiVersion: v1
kind: Secret
metadata:
  name: foo-secret-bar-9btc7bt4kb
  namespace: ns1
  labels:
    app: nginx
  annotations:
    note: This is a test annotation
type: Opaque
data:
  DB_USERNAME: YWRtaW4=
  DB_PASSWORD: c29tZXB3
"
        )
    );
}

#[test]
fn test_accumulate_target_keeps_generated_names() {
    let mut target = target_at(&whatever_files(), "/whatever");
    let acc = target.accumulate_target().unwrap();
    let mut map = acc.resmap;
    map.remove_build_annotations();
    assert_eq!(
        names(&map),
        vec!["dply1", "ns1", "literalConfigMap", "secret"]
    );
    assert!(find(&map, "Deployment").value().get("spec").is_none());
}

#[test]
fn test_build_annotations_are_kept_until_removed() {
    let mut target = target_at(&whatever_files(), "/whatever");
    let map = target.make_customized_res_map().unwrap();
    let config_map = find(&map, "ConfigMap");
    assert_eq!(config_map.org_id().name, "literalConfigMap");
    assert!(!config_map.needs_hash_suffix());
    assert!(config_map
        .annotations()
        .keys()
        .any(|k| k.starts_with("internal.config.kubernetes.io/")));
}

#[test]
fn test_load_reports_the_configuration() {
    let mut target = target_at(&whatever_files(), "/whatever");
    let kust = target.load().unwrap();
    assert_eq!(kust.name_prefix, "foo-");
    assert_eq!(kust.kind, "Kustomization");
    assert_eq!(kust.api_version, "kustomize.config.k8s.io/v1beta1");
    assert_eq!(kust.config_map_generator.len(), 1);
}

#[test]
fn test_configurations_override_default() {
    let files = [
        (
            "/app/kustomization.yaml",
            "namePrefix: foo-
commonLabels:
  team: web
configurations:
- config.yaml
resources:
- deployment.yaml
- configmap.yaml
",
        ),
        (
            "/app/config.yaml",
            "namePrefix:
- kind: Deployment
  path: metadata/name
commonLabels:
- kind: Deployment
  path: spec/template/metadata/labels
  create: true
",
        ),
        (
            "/app/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: deployment1\n",
        ),
        (
            "/app/configmap.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: config\n",
        ),
    ];
    let map = build(&files, "/app").unwrap();

    // the wildcard metadata/name rule was replaced by the Deployment-only one
    assert_eq!(names(&map), vec!["foo-deployment1", "config"]);

    // Deployment-specific label rules were replaced; the wildcard one stays
    let deployment = find(&map, "Deployment");
    assert_eq!(deployment.labels().get("team").map(String::as_str), Some("web"));
    assert!(deployment.value()["spec"].get("selector").is_none());
    assert_eq!(
        deployment.value()["spec"]["template"]["metadata"]["labels"]["team"].as_str(),
        Some("web")
    );
    assert_eq!(
        find(&map, "ConfigMap").labels().get("team").map(String::as_str),
        Some("web")
    );
}

#[test]
fn test_duplicate_external_generators() {
    let generator = "apiVersion: generators.example/v1
kind: ManifestGenerator
metadata:
  name: ManifestGenerator
  annotations:
    config.kubernetes.io/function: |
      container:
        image: ManifestGenerator:latest
spec:
  image: whatever
";
    let files = [
        (
            "/app/kustomization.yaml",
            "generators:\n- gen1.yaml\n- gen2.yaml\n",
        ),
        ("/app/gen1.yaml", generator),
        ("/app/gen2.yaml", generator),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::DuplicatePluginIdentity { .. }));
    assert!(err.to_string().contains(
        "may not add resource with an already registered id: ManifestGenerator.v1.generators.example/ManifestGenerator"
    ));
}

#[test]
fn test_duplicate_external_transformers() {
    let transformer = "apiVersion: transformers.example.co/v1
kind: ValueAnnotator
metadata:
  name: notImportantHere
  annotations:
    config.kubernetes.io/function: |
      container:
        image: example.docker.com/my-functions/valueannotator:1.0.0
value: 'important-data'
";
    let kustomization = format!(
        "transformers:\n- |-\n{}- |-\n{}",
        indent(transformer),
        indent(transformer)
    );
    let files = [("/app/kustomization.yaml", kustomization.as_str())];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::DuplicatePluginIdentity { .. }));
    assert!(err
        .to_string()
        .contains("ValueAnnotator.v1.transformers.example.co/notImportantHere"));
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {}\n", l)).collect()
}

#[test]
fn test_external_generator_not_enabled() {
    let files = [
        ("/app/kustomization.yaml", "generators:\n- gen.yaml\n"),
        (
            "/app/gen.yaml",
            "apiVersion: generators.example/v1
kind: ManifestGenerator
metadata:
  name: gen
  annotations:
    config.kubernetes.io/function: |
      exec:
        path: ./gen.sh
",
        ),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::PluginExecution { .. }));
    assert!(err.to_string().contains("external plugins are not enabled"));
}

#[test]
fn test_ambiguous_kustomization() {
    let files = [
        ("/app/kustomization.yaml", "resources: []\n"),
        ("/app/kustomization.yml", "resources: []\n"),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::AmbiguousConfig { .. }));
    assert!(err.to_string().contains("Found multiple kustomization files under: /app"));
}

#[test]
fn test_missing_kustomization() {
    let files = [("/app/deployment.yaml", "kind: Deployment\n")];
    let err = build(&files, "/app").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to find one of 'kustomization.yaml', 'kustomization.yml' or 'Kustomization' in directory '/app'"
    );
}

#[test]
fn test_empty_kustomization() {
    let files = [("/app/kustomization.yaml", "# nothing here\n\n")];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::EmptyConfig { .. }));
    assert_eq!(err.to_string(), "kustomization.yaml is empty");
}

#[test]
fn test_tab_indented_kustomization() {
    let files = [(
        "/app/kustomization.yaml",
        "resources:\n\t- deployment.yaml\n",
    )];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert!(err
        .to_string()
        .contains("found a tab character that violates indentation"));
}

#[test]
fn test_base_namespace_with_overlay_labels() {
    let files = [
        (
            "/app/base/kustomization.yaml",
            "namespace: base-ns\nresources:\n- service.yaml\n",
        ),
        (
            "/app/base/service.yaml",
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  selector:\n    app: web\n",
        ),
        (
            "/app/overlay/kustomization.yaml",
            "commonLabels:\n  env: prod\nresources:\n- ../base\n",
        ),
    ];
    let map = build(&files, "/app/overlay").unwrap();
    let service = find(&map, "Service");
    assert_eq!(service.namespace(), "base-ns");
    assert_eq!(
        service.value(),
        &yaml(
            "apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: base-ns
  labels:
    env: prod
spec:
  selector:
    app: web
    env: prod
"
        )
    );
}

#[test]
fn test_overlay_patch_reaches_renamed_base_resource() {
    let files = [
        (
            "/app/base/kustomization.yaml",
            "namePrefix: base-\nresources:\n- deployment.yaml\n",
        ),
        (
            "/app/base/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 1\n",
        ),
        (
            "/app/overlay/kustomization.yaml",
            "namePrefix: prod-
resources:
- ../base
patches:
- patch: |
    apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
    spec:
      replicas: 5
",
        ),
    ];
    let map = build(&files, "/app/overlay").unwrap();
    let deployment = find(&map, "Deployment");
    assert_eq!(deployment.name(), "prod-base-web");
    assert_eq!(deployment.value()["spec"]["replicas"].as_i64(), Some(5));
}

#[test]
fn test_json6902_ambiguous_target() {
    let files = [
        (
            "/app/kustomization.yaml",
            "resources:
- deployments.yaml
patchesJson6902:
- target:
    kind: Deployment
    name: web.*
  patch: |
    - op: replace
      path: /spec/replicas
      value: 2
",
        ),
        (
            "/app/deployments.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 1\n---\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web-canary\nspec:\n  replicas: 1\n",
        ),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::PatchTargetNotFound { .. }));
}

#[test]
fn test_json6902_missing_target() {
    let files = [
        (
            "/app/kustomization.yaml",
            "patchesJson6902:
- target:
    kind: Deployment
    name: nothing
  patch: '[{\"op\": \"remove\", \"path\": \"/spec\"}]'
",
        ),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::PatchTargetNotFound { .. }));
}

#[test]
fn test_base_cycle() {
    let files = [
        ("/a/kustomization.yaml", "resources:\n- ../b\n"),
        ("/b/kustomization.yaml", "resources:\n- ../a\n"),
    ];
    let err = build(&files, "/a").unwrap_err();
    assert!(matches!(err, Error::BaseResolution { .. }));
    match err.root_cause() {
        Error::CycleDetected { cycle } => assert_eq!(cycle, "/a -> /b -> /a"),
        other => panic!("unexpected root cause: {}", other),
    }
}

#[test]
fn test_same_base_twice_conflicts() {
    let files = [
        ("/app/base/kustomization.yaml", "resources:\n- cm.yaml\n"),
        (
            "/app/base/cm.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
        ),
        ("/app/left/kustomization.yaml", "resources:\n- ../base\n"),
        ("/app/right/kustomization.yaml", "resources:\n- ../base\n"),
        (
            "/app/kustomization.yaml",
            "resources:\n- left\n- right\n",
        ),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::IdentityConflict { .. }));
}

#[test]
fn test_identity_conflict_between_files() {
    let cm = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n";
    let files = [
        ("/app/kustomization.yaml", "resources:\n- a.yaml\n- b.yaml\n"),
        ("/app/a.yaml", cm),
        ("/app/b.yaml", cm),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert_eq!(
        err.to_string(),
        "in resource file 'b.yaml': may not add resource with an already registered id: ConfigMap.v1.[noGrp]/cm.[noNs]"
    );
    assert!(matches!(err.root_cause(), Error::IdentityConflict { .. }));
}

#[test]
fn test_default_namespace_is_distinct_from_none() {
    let files = [
        ("/app/kustomization.yaml", "resources:\n- a.yaml\n- b.yaml\n"),
        (
            "/app/a.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
        ),
        (
            "/app/b.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n  namespace: default\n",
        ),
    ];
    let map = build(&files, "/app").unwrap();
    assert_eq!(map.len(), 2);
}

#[test]
fn test_component_transforms_parent_resources() {
    let files = [
        ("/app/base/kustomization.yaml", "resources:\n- deployment.yaml\n"),
        (
            "/app/base/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        ),
        (
            "/app/monitoring/kustomization.yaml",
            "apiVersion: kustomize.config.k8s.io/v1alpha1
kind: Component
resources:
- service-monitor.yaml
commonAnnotations:
  monitored: \"true\"
",
        ),
        (
            "/app/monitoring/service-monitor.yaml",
            "apiVersion: monitoring.coreos.com/v1\nkind: ServiceMonitor\nmetadata:\n  name: web\n",
        ),
        (
            "/app/overlay/kustomization.yaml",
            "resources:\n- ../base\ncomponents:\n- ../monitoring\n",
        ),
    ];
    let map = build(&files, "/app/overlay").unwrap();
    assert_eq!(names(&map), vec!["web", "web"]);
    for res in map.iter() {
        assert_eq!(
            res.annotations().get("monitored").map(String::as_str),
            Some("true")
        );
    }
}

#[test]
fn test_kustomization_as_component_is_rejected() {
    let files = [
        ("/app/plain/kustomization.yaml", "resources: []\n"),
        ("/app/kustomization.yaml", "components:\n- plain\n"),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::BaseResolution { .. }));
    assert!(err.to_string().contains("expected kind 'Component'"));
}

#[test]
fn test_generator_merge_behavior() {
    let files = [
        (
            "/app/base/kustomization.yaml",
            "configMapGenerator:\n- name: cm\n  literals:\n  - A=1\n",
        ),
        (
            "/app/overlay/kustomization.yaml",
            "resources:
- ../base
configMapGenerator:
- name: cm
  behavior: merge
  literals:
  - B=2
",
        ),
    ];
    let map = build(&files, "/app/overlay").unwrap();
    assert_eq!(map.len(), 1);
    let cm = find(&map, "ConfigMap");
    assert_eq!(cm.name(), "cm-k2kg9hdghb");
    assert_eq!(cm.value()["data"], yaml("A: \"1\"\nB: \"2\"\n"));
}

#[test]
fn test_generator_replace_behavior() {
    let files = [
        (
            "/app/base/kustomization.yaml",
            "configMapGenerator:\n- name: cm\n  literals:\n  - A=1\n",
        ),
        (
            "/app/overlay/kustomization.yaml",
            "resources:
- ../base
configMapGenerator:
- name: cm
  behavior: replace
  literals:
  - B=2
",
        ),
    ];
    let map = build(&files, "/app/overlay").unwrap();
    let cm = find(&map, "ConfigMap");
    assert_eq!(cm.name(), "cm-b8tmmht5kc");
    assert_eq!(cm.value()["data"], yaml("B: \"2\"\n"));
}

#[test]
fn test_generator_merge_without_target_appends() {
    testing_logger::setup();
    let files = [(
        "/app/kustomization.yaml",
        "configMapGenerator:\n- name: cm\n  behavior: merge\n  literals:\n  - B=2\n",
    )];
    let map = build(&files, "/app").unwrap();
    assert_eq!(names(&map), vec!["cm-b8tmmht5kc"]);
    testing_logger::validate(|logs| {
        assert!(logs.iter().any(|log| log.level == log::Level::Warn
            && log.body.contains("for behavior 'merge'; appending it instead")));
    });
}

#[test]
fn test_generated_name_reference_is_rewritten() {
    let files = [
        (
            "/app/kustomization.yaml",
            "resources:
- deployment.yaml
configMapGenerator:
- name: settings
  literals:
  - A=1
",
        ),
        (
            "/app/deployment.yaml",
            "apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
      - name: web
        image: nginx
        envFrom:
        - configMapRef:
            name: settings
",
        ),
    ];
    let map = build(&files, "/app").unwrap();
    let cm_name = find(&map, "ConfigMap").name().to_string();
    assert!(cm_name.starts_with("settings-"));
    let deployment = find(&map, "Deployment");
    assert_eq!(
        deployment.value()["spec"]["template"]["spec"]["containers"][0]["envFrom"][0]
            ["configMapRef"]["name"]
            .as_str(),
        Some(cm_name.as_str())
    );
}

#[test]
fn test_builtin_transformer_declared_in_transformers() {
    let files = [
        (
            "/app/kustomization.yaml",
            "resources:\n- cm.yaml\ntransformers:\n- labels.yaml\n",
        ),
        (
            "/app/cm.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
        ),
        (
            "/app/labels.yaml",
            "apiVersion: builtin
kind: LabelTransformer
metadata:
  name: tier
labels:
  tier: backend
fieldSpecs:
- path: metadata/labels
  create: true
",
        ),
    ];
    let map = build(&files, "/app").unwrap();
    assert_eq!(
        find(&map, "ConfigMap").labels().get("tier").map(String::as_str),
        Some("backend")
    );
}

#[test]
fn test_build_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("base")).unwrap();
    std::fs::write(
        root.join("base/kustomization.yaml"),
        "resources:\n- cm.yaml\n",
    )
    .unwrap();
    std::fs::write(
        root.join("base/cm.yaml"),
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
    )
    .unwrap();
    std::fs::write(
        root.join("kustomization.yaml"),
        "namePrefix: disk-\nresources:\n- base\n",
    )
    .unwrap();

    let map = target::build(root, BuildOptions::default().with_cache_root(None)).unwrap();
    assert_eq!(names(&map), vec!["disk-cm"]);
    assert!(map.iter().next().unwrap().annotations().is_empty());
}

#[test]
fn test_file_outside_root_is_rejected() {
    let files = [
        ("/app/overlay/kustomization.yaml", "resources:\n- ../secret.yaml\n"),
        (
            "/app/secret.yaml",
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: s\n",
        ),
    ];
    let err = build(&files, "/app/overlay").unwrap_err();
    assert!(err.to_string().contains("security; file is not in or below"));
}

#[test]
fn test_base_name_rule_does_not_double_prefix() {
    let files = [
        ("/app/kustomization.yaml", "namePrefix: top-\nresources:\n- base\n"),
        (
            "/app/base/kustomization.yaml",
            "configurations:\n- config.yaml\nresources:\n- deployment.yaml\n",
        ),
        (
            "/app/base/config.yaml",
            "namePrefix:\n- kind: Deployment\n  path: metadata/name\n",
        ),
        (
            "/app/base/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        ),
    ];
    let map = build(&files, "/app").unwrap();
    assert_eq!(names(&map), vec!["top-web"]);
}

#[test]
fn test_accumulate_target_rejects_duplicate_transformers() {
    let transformer = "apiVersion: transformers.example.co/v1
kind: ValueAnnotator
metadata:
  name: notImportantHere
  annotations:
    config.kubernetes.io/function: |
      container:
        image: example.docker.com/my-functions/valueannotator:1.0.0
value: 'important-data'
";
    let files = [
        (
            "/app/kustomization.yaml",
            "resources:\n- cm.yaml\ntransformers:\n- annotator1.yaml\n- annotator2.yaml\n",
        ),
        ("/app/cm.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n"),
        ("/app/annotator1.yaml", transformer),
        ("/app/annotator2.yaml", transformer),
    ];
    let mut target = target_at(&files, "/app");
    let err = target.accumulate_target().unwrap_err();
    assert!(matches!(err, Error::DuplicatePluginIdentity { .. }));
    assert!(err
        .to_string()
        .contains("ValueAnnotator.v1.transformers.example.co/notImportantHere"));
}

#[test]
fn test_untargeted_patch_matching_renamed_and_original_fails() {
    let files = [
        (
            "/app/kustomization.yaml",
            "resources:\n- base\n- deployment.yaml\npatches:\n- path: replicas.yaml\n",
        ),
        (
            "/app/base/kustomization.yaml",
            "namePrefix: b-\nresources:\n- deployment.yaml\n",
        ),
        (
            "/app/base/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        ),
        (
            "/app/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        ),
        (
            "/app/replicas.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 9\n",
        ),
    ];
    let err = build(&files, "/app").unwrap_err();
    assert!(matches!(err, Error::PatchTargetNotFound { .. }));
    assert!(err.to_string().contains("found multiple possible resources"));
}
