//! Supervisor 构建器：统一的初始化逻辑
//!
//! 二进制与测试共用同一套装配：LLM 后端、检查点与记忆存储、子流程注册。
//! build 时校验分派表中的每个子流程都已注册。

use std::sync::Arc;

use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
use crate::config::{AppConfig, StoreBackend};
use crate::core::{Classifier, OrchestratorError, Supervisor};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{InMemoryMemoryStore, MemoryStore, MemoryWriter, SqliteMemoryStore};
use crate::tools::{SearchTool, ThinkTool, ToolRegistry};
use crate::workflow::{
    AddressBookWorkflow, Contact, FileWorkflow, KeywordRetriever, MoreInfoWorkflow,
    ResearchWorkflow, RespondGeneralWorkflow, RetrievalWorkflow, Retriever, SubWorkflow,
    TravelWorkflow, WebSearchWorkflow, WorkflowExecutor, WorkflowRegistry,
};

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / 离线 Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();
    let timeout = cfg.llm.timeouts.request;

    match provider.as_str() {
        "deepseek" if has_deepseek_key || has_openai_key => {
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            Arc::new(
                create_deepseek_client(Some(&cfg.llm.model), cfg.llm.base_url.as_deref())
                    .with_request_timeout(timeout),
            )
        }
        "openai" if has_openai_key => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            Arc::new(
                OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, None)
                    .with_request_timeout(timeout),
            )
        }
        "mock" => Arc::new(MockLlmClient::offline()),
        _ => {
            tracing::warn!(provider = %provider, "No API key set or provider unknown, using offline Mock LLM");
            Arc::new(MockLlmClient::offline())
        }
    }
}

pub struct SupervisorBuilder {
    llm: Arc<dyn LlmClient>,
    config: AppConfig,
    registry: WorkflowRegistry,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    memory_store: Option<Arc<dyn MemoryStore>>,
    router_prompt: Option<String>,
}

impl SupervisorBuilder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            config: AppConfig::default(),
            registry: WorkflowRegistry::new(),
            checkpoints: None,
            memory_store: None,
            router_prompt: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn with_memory_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory_store = Some(store);
        self
    }

    /// 关闭长期记忆写入
    pub fn without_memory(mut self) -> Self {
        self.config.memory.enabled = false;
        self
    }

    pub fn with_router_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.router_prompt = Some(prompt.into());
        self
    }

    /// 注册（或替换）一个子流程
    pub fn register(mut self, workflow: impl SubWorkflow + 'static) -> Self {
        self.registry.register(workflow);
        self
    }

    pub fn register_arc(mut self, workflow: Arc<dyn SubWorkflow>) -> Self {
        self.registry.register_arc(workflow);
        self
    }

    /// 按配置注册内置子流程；通讯录与知识文件缺失时以空数据继续
    pub async fn with_default_workflows(mut self) -> Self {
        let llm = Arc::clone(&self.llm);
        let wf = self.config.workflows.clone();
        let limit = wf.tool_call_iteration_limit;

        let contacts = match Contact::load_all(&wf.address_book_path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %wf.address_book_path.display(), error = %e, "address book not loaded");
                Vec::new()
            }
        };
        let knowledge = match KeywordRetriever::from_file(&wf.knowledge_path).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %wf.knowledge_path.display(), error = %e, "knowledge file not loaded");
                KeywordRetriever::default()
            }
        };
        let retriever: Arc<dyn Retriever> = Arc::new(knowledge);

        let search = SearchTool::new(
            wf.search.allowed_domains.clone(),
            wf.search.timeout_secs,
            wf.search.max_result_chars,
        );
        let mut travel_tools = ToolRegistry::new();
        travel_tools.register(SearchTool::new(
            wf.search.allowed_domains.clone(),
            wf.search.timeout_secs,
            wf.search.max_result_chars,
        ));
        travel_tools.register(ThinkTool);

        self.registry.register(RespondGeneralWorkflow::new(Arc::clone(&llm)));
        self.registry.register(MoreInfoWorkflow::new(Arc::clone(&llm)));
        self.registry.register(FileWorkflow::new(Arc::clone(&llm), &wf.workspace_root));
        self.registry.register(AddressBookWorkflow::new(Arc::clone(&llm), contacts));
        self.registry.register(RetrievalWorkflow::new(Arc::clone(&llm), Arc::clone(&retriever)));
        self.registry.register(ResearchWorkflow::new(Arc::clone(&llm), retriever));
        self.registry.register(WebSearchWorkflow::with_search_tool(
            Arc::clone(&llm),
            search,
            wf.tool_timeout_secs,
            limit,
        ));
        self.registry.register(TravelWorkflow::new(llm, travel_tools, wf.tool_timeout_secs, limit));
        self
    }

    pub fn build(self) -> Result<Supervisor, OrchestratorError> {
        validate(&self.config)?;
        self.registry.ensure_complete()?;

        let checkpoints: Arc<dyn CheckpointStore> = match self.checkpoints {
            Some(store) => store,
            None => match self.config.checkpoint.backend {
                StoreBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
                StoreBackend::Sqlite => Arc::new(SqliteCheckpointStore::open(&self.config.checkpoint.path)?),
            },
        };

        let memory_writer = if self.config.memory.enabled {
            let store: Arc<dyn MemoryStore> = match self.memory_store {
                Some(store) => store,
                None => match self.config.memory.backend {
                    StoreBackend::Memory => Arc::new(InMemoryMemoryStore::new()),
                    StoreBackend::Sqlite => Arc::new(SqliteMemoryStore::open(&self.config.memory.path)?),
                },
            };
            Some(MemoryWriter::new(Arc::clone(&self.llm), store))
        } else {
            None
        };

        let mut classifier = Classifier::new(Arc::clone(&self.llm));
        if let Some(prompt) = self.router_prompt {
            classifier = classifier.with_system_prompt(prompt);
        }

        let executor = WorkflowExecutor::new(self.registry, self.config.workflows.timeout_secs);
        Ok(Supervisor::new(
            classifier,
            executor,
            memory_writer,
            checkpoints,
            self.config.app.user_name.clone(),
        ))
    }
}

fn validate(cfg: &AppConfig) -> Result<(), OrchestratorError> {
    if cfg.workflows.timeout_secs == 0 || cfg.workflows.tool_timeout_secs == 0 {
        return Err(OrchestratorError::Config("workflow timeouts must be positive".to_string()));
    }
    if cfg.app.user_name.trim().is_empty() {
        return Err(OrchestratorError::Config("app.user_name must not be empty".to_string()));
    }
    Ok(())
}

/// 从配置装配完整的 Supervisor（内置子流程 + 配置中的存储后端）
pub async fn build_supervisor(config: AppConfig) -> Result<Supervisor, OrchestratorError> {
    let llm = create_llm_from_config(&config);
    SupervisorBuilder::new(llm)
        .with_config(config)
        .with_default_workflows()
        .await
        .build()
}
