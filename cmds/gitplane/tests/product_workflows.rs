mod common;

use std::{
	fs,
	path::{Path, PathBuf},
};

use assert_matches::assert_matches;
use common::{caller, FakeGit, FakeHosting, Harness, StaticLookup, PRODUCT_URL};
use gitplane::{
	collab::ProjectOptions,
	usecase::{CodeRepoUsecase, EnvironmentUsecase, PipelineRuntimeUsecase},
	Error,
};
use indoc::indoc;
use restree::{
	resource::{CodeRepoSpec, EnvironmentSpec, ProjectPipelineRuntimeSpec},
	Kind, Resource,
};

const DEV_ENV: &str = indoc! {"
	apiVersion: nautes.resource.nautes.io/v1alpha1
	kind: Environment
	metadata:
	  name: dev
	spec:
	  product: product-7
	  cluster: worker-a
	  envType: dev
"};

const ORPHAN_ENV: &str = indoc! {"
	apiVersion: nautes.resource.nautes.io/v1alpha1
	kind: Environment
	metadata:
	  name: orphan
	spec:
	  product: product-7
	  cluster: gone-cluster
	  envType: dev
"};

const SVC_A_REPO: &str = indoc! {"
	apiVersion: nautes.resource.nautes.io/v1alpha1
	kind: CodeRepo
	metadata:
	  name: repo-42
	spec:
	  codeRepoProvider: gitlab
	  product: product-7
	  repoName: svc-a
	  webhook:
	    events: []
	  deploymentRuntime: true
	  pipelineRuntime: false
"};

const DEPLOYMENT_RUNTIME: &str = indoc! {"
	apiVersion: nautes.resource.nautes.io/v1alpha1
	kind: DeploymentRuntime
	metadata:
	  name: dr
	spec:
	  product: product-7
	  projectsRef: []
	  manifestSource:
	    codeRepo: repo-42
	    targetRevision: main
	    path: deploy
	  destination: dev
"};

fn seed(root: &Path, files: &[(&str, &str)]) {
	for (path, text) in files {
		let path = root.join(path);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, text).unwrap();
	}
}

fn harness(hosting: FakeHosting, files: &[(&str, &str)]) -> Harness {
	let git = FakeGit::new();
	seed(&git.remote(PRODUCT_URL), files);
	let hosting = hosting
		.with_group(7, "acme")
		.with_project(1, "acme/default.project", PRODUCT_URL);
	let lookup = StaticLookup::default()
		.with(Kind::CodeRepoProvider, "gitlab")
		.with(Kind::Cluster, "worker-a")
		.with(Kind::Cluster, "worker-b");
	Harness::new(git, hosting, lookup)
}

fn product_remote(h: &Harness) -> PathBuf {
	h.git.remote_path(PRODUCT_URL)
}

#[tokio::test]
async fn test_create_code_repo() {
	let h = harness(FakeHosting::new(), &[("envs/dev.yaml", DEV_ENV)]);
	let usecase = CodeRepoUsecase::new(h.resources());

	let repo = usecase
		.save(
			&caller(),
			"acme",
			"svc-a",
			CodeRepoSpec::default(),
			&ProjectOptions {
				visibility: "private".to_owned(),
				..ProjectOptions::default()
			},
			false,
		)
		.await
		.unwrap();

	let project = h.hosting.project("acme/svc-a").unwrap();
	assert_eq!(repo.name(), format!("repo-{}", project.id));
	assert_eq!(h.hosting.calls(), ["create_project svc-a"]);

	let remote = product_remote(&h);
	let file = remote.join(format!("code-repos/repo-{0}/repo-{0}.yaml", project.id));
	let stored = Resource::from_yaml(&fs::read_to_string(file).unwrap()).unwrap();
	assert_matches!(stored, Some(Resource::CodeRepo(stored)) => {
		assert_eq!(stored.spec.product, "product-7");
		assert_eq!(stored.spec.repo_name, "svc-a");
		assert_eq!(stored.spec.code_repo_provider, "gitlab");
	});
	let kustomization = fs::read_to_string(remote.join("production/kustomization.yaml")).unwrap();
	assert!(kustomization.contains(&format!("../code-repos/repo-{0}/repo-{0}.yaml", project.id)));
	assert!(kustomization.contains("../envs/dev.yaml"));

	let keys = h.hosting.deploy_keys(project.id);
	assert_eq!(keys.len(), 1);
	let stored_key = h.secrets.deploy_keys.lock().unwrap()[&project.id].clone();
	assert_eq!(stored_key.extra["deployKeyId"], keys[0].id.to_string());
	assert_eq!(stored_key.extra["fingerprint"], keys[0].key);
	assert!(stored_key.private_key.contains("OPENSSH PRIVATE KEY"));

	assert_eq!(h.git.pushes(), 1);
	assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn test_get_translates_product_name() {
	let hosting = FakeHosting::new().with_project(42, "acme/svc-a", "https://git.example.com/acme/svc-a.git");
	let h = harness(
		hosting,
		&[("envs/dev.yaml", DEV_ENV), ("code-repos/repo-42/repo-42.yaml", SVC_A_REPO)],
	);
	let usecase = CodeRepoUsecase::new(h.resources());

	let repo = usecase.get(&caller(), "acme", "svc-a").await.unwrap();
	assert_eq!(repo.name(), "repo-42");
	assert_eq!(repo.spec.product, "acme");

	let repos = usecase.list(&caller(), "acme").await.unwrap();
	assert_eq!(repos.len(), 1);
	assert_eq!(h.git.pushes(), 0);
}

#[tokio::test]
async fn test_saving_rotates_stale_deploy_keys() {
	let mut hosting = FakeHosting::new().with_project(42, "acme/svc-a", "https://git.example.com/acme/svc-a.git");
	for key_id in 1..=12 {
		hosting = hosting.with_deploy_key(42, key_id);
	}
	let h = harness(
		hosting,
		&[("envs/dev.yaml", DEV_ENV), ("code-repos/repo-42/repo-42.yaml", SVC_A_REPO)],
	);
	let usecase = CodeRepoUsecase::new(h.resources());
	let spec = CodeRepoSpec {
		deployment_runtime: true,
		..CodeRepoSpec::default()
	};

	usecase
		.save(&caller(), "acme", "svc-a", spec.clone(), &ProjectOptions::default(), false)
		.await
		.unwrap();
	let keys = h.hosting.deploy_keys(42);
	assert_eq!(keys.len(), 1);
	let deletions = h
		.hosting
		.calls()
		.iter()
		.filter(|call| call.starts_with("delete_deploy_key"))
		.count();
	assert_eq!(deletions, 12);
	assert_eq!(*h.secrets.authorized.lock().unwrap(), [(42, "Argo".to_owned())]);

	// A second save finds the recorded key and leaves it alone.
	usecase
		.save(&caller(), "acme", "svc-a", spec, &ProjectOptions::default(), false)
		.await
		.unwrap();
	assert_eq!(h.hosting.deploy_keys(42), keys);
}

#[tokio::test]
async fn test_deleting_a_referenced_repo_is_refused() {
	let hosting = FakeHosting::new().with_project(42, "acme/svc-a", "https://git.example.com/acme/svc-a.git");
	let h = harness(
		hosting,
		&[
			("envs/dev.yaml", DEV_ENV),
			("code-repos/repo-42/repo-42.yaml", SVC_A_REPO),
			("runtimes/dr.yaml", DEPLOYMENT_RUNTIME),
		],
	);
	let usecase = CodeRepoUsecase::new(h.resources());

	let err = usecase.delete(&caller(), "acme", "svc-a", false).await.unwrap_err();
	assert_matches!(
		err,
		Error::Tree(restree::Error::DanglingReference { kind: Kind::CodeRepo, name, referrer, .. })
			if name == "repo-42" && referrer == "dr"
	);

	assert!(product_remote(&h).join("code-repos/repo-42/repo-42.yaml").exists());
	assert!(!h.hosting.calls().iter().any(|call| call.starts_with("delete_project")));
	assert!(h.secrets.deleted.lock().unwrap().is_empty());
	assert_eq!(h.git.pushes(), 0);
	assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn test_delete_unreferenced_repo() {
	let hosting = FakeHosting::new().with_project(42, "acme/svc-a", "https://git.example.com/acme/svc-a.git");
	let h = harness(
		hosting,
		&[("envs/dev.yaml", DEV_ENV), ("code-repos/repo-42/repo-42.yaml", SVC_A_REPO)],
	);
	let usecase = CodeRepoUsecase::new(h.resources());

	usecase.delete(&caller(), "acme", "svc-a", false).await.unwrap();

	let remote = product_remote(&h);
	assert!(!remote.join("code-repos/repo-42").exists());
	let kustomization = fs::read_to_string(remote.join("production/kustomization.yaml")).unwrap();
	assert!(!kustomization.contains("repo-42"));
	assert!(h.hosting.project("acme/svc-a").is_none());
	assert_eq!(*h.secrets.deleted.lock().unwrap(), [42]);
	assert_eq!(h.git.pushes(), 1);
}

#[tokio::test]
async fn test_environment_checks() {
	let h = harness(FakeHosting::new(), &[("envs/dev.yaml", DEV_ENV)]);
	let usecase = EnvironmentUsecase::new(h.resources());
	let spec = |cluster: &str| EnvironmentSpec {
		cluster: cluster.to_owned(),
		env_type: "qa".to_owned(),
		..EnvironmentSpec::default()
	};

	assert_matches!(
		usecase.save(&caller(), "acme", "qa", spec("unknown"), false).await,
		Err(Error::Tree(restree::Error::DanglingReference { kind: Kind::Cluster, .. }))
	);
	assert_matches!(
		usecase.save(&caller(), "acme", "qa", spec("worker-a"), false).await,
		Err(Error::Tree(restree::Error::DuplicateReference { kind: Kind::Environment, .. }))
	);
	assert_eq!(h.git.pushes(), 0);

	let env = usecase.save(&caller(), "acme", "qa", spec("worker-b"), false).await.unwrap();
	assert_eq!(env.spec.product, "product-7");
	assert!(product_remote(&h).join("envs/qa.yaml").exists());

	let envs = usecase.list(&caller(), "acme").await.unwrap();
	let mut names: Vec<_> = envs.iter().map(|env| env.name().to_owned()).collect();
	names.sort();
	assert_eq!(names, ["dev", "qa"]);
	assert!(envs.iter().all(|env| env.spec.product == "acme"));
}

#[tokio::test]
async fn test_pipeline_runtime_with_unknown_source() {
	let h = harness(FakeHosting::new(), &[("envs/dev.yaml", DEV_ENV)]);
	let usecase = PipelineRuntimeUsecase::new(h.resources());
	let spec = ProjectPipelineRuntimeSpec {
		project: "web".to_owned(),
		pipeline_source: "missing".to_owned(),
		destination: "dev".to_owned(),
		..ProjectPipelineRuntimeSpec::default()
	};

	assert_matches!(
		usecase.save(&caller(), "acme", "ppr", spec, false).await,
		Err(Error::ResourceNotFound { kind: Kind::CodeRepo, name }) if name == "missing"
	);
	assert_eq!(h.git.pushes(), 0);
}

fn svc_a_hosting() -> FakeHosting {
	FakeHosting::new().with_project(42, "acme/svc-a", "https://git.example.com/acme/svc-a.git")
}

#[tokio::test]
async fn test_code_repo_skip_check_tolerates_a_broken_tree() {
	let h = harness(
		svc_a_hosting(),
		&[("envs/orphan.yaml", ORPHAN_ENV), ("code-repos/repo-42/repo-42.yaml", SVC_A_REPO)],
	);
	let usecase = CodeRepoUsecase::new(h.resources());

	assert_matches!(
		usecase.delete(&caller(), "acme", "svc-a", false).await,
		Err(Error::Tree(restree::Error::DanglingReference { kind: Kind::Cluster, name, .. })) if name == "gone-cluster"
	);
	assert_matches!(
		usecase
			.save(&caller(), "acme", "svc-b", CodeRepoSpec::default(), &ProjectOptions::default(), false)
			.await,
		Err(Error::Tree(restree::Error::DanglingReference { kind: Kind::Cluster, .. }))
	);
	assert_eq!(h.git.pushes(), 0);

	let repo = usecase
		.save(&caller(), "acme", "svc-b", CodeRepoSpec::default(), &ProjectOptions::default(), true)
		.await
		.unwrap();
	let remote = product_remote(&h);
	assert!(remote.join(format!("code-repos/{0}/{0}.yaml", repo.name())).exists());

	usecase.delete(&caller(), "acme", "svc-a", true).await.unwrap();
	assert!(!remote.join("code-repos/repo-42").exists());
	assert!(remote.join("envs/orphan.yaml").exists());
	assert!(h.hosting.project("acme/svc-a").is_none());
	assert_eq!(h.git.pushes(), 2);
	assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn test_environment_skip_check_tolerates_a_broken_tree() {
	let h = harness(FakeHosting::new(), &[("envs/orphan.yaml", ORPHAN_ENV)]);
	let usecase = EnvironmentUsecase::new(h.resources());
	let spec = EnvironmentSpec {
		cluster: "worker-a".to_owned(),
		env_type: "qa".to_owned(),
		..EnvironmentSpec::default()
	};

	assert_matches!(
		usecase.save(&caller(), "acme", "qa", spec.clone(), false).await,
		Err(Error::Tree(restree::Error::DanglingReference { kind: Kind::Cluster, .. }))
	);
	assert_matches!(
		usecase.delete(&caller(), "acme", "orphan", false).await,
		Err(Error::Tree(restree::Error::DanglingReference { kind: Kind::Cluster, .. }))
	);

	usecase.save(&caller(), "acme", "qa", spec, true).await.unwrap();
	assert!(product_remote(&h).join("envs/qa.yaml").exists());

	usecase.delete(&caller(), "acme", "orphan", true).await.unwrap();
	assert!(!product_remote(&h).join("envs/orphan.yaml").exists());
	assert_eq!(h.git.pushes(), 2);
}
