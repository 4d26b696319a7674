//! Hive - 命令行入口
//!
//! 从标准输入逐行读取对话：每行是线程 `cli` 上的一轮。
//! `@file:<path> 问题` 附带文件，`/web 问题` 指定网页搜索，`/quit` 退出。
//! 挂起时输入 `y` 同意分类，或直接输入替换的分类名。

use std::path::PathBuf;

use anyhow::Context;
use hive::config::load_config;
use hive::core::build_supervisor;
use hive::{ApprovalResponse, Message, OrchestratorError, Supervisor, TurnFlags, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const THREAD_ID: &str = "cli";

fn parse_input(line: &str) -> (Message, TurnFlags) {
    let mut flags = TurnFlags::default();
    let mut text = line.trim();
    if let Some(rest) = text.strip_prefix("/web ") {
        flags.web_search = true;
        text = rest.trim();
    }
    if let Some(rest) = text.strip_prefix("@file:") {
        let (path, question) = rest.split_once(' ').unwrap_or((rest, ""));
        return (Message::user(question.trim()).with_file(path), flags);
    }
    (Message::user(text), flags)
}

fn parse_approval(line: &str) -> ApprovalResponse {
    match line.trim() {
        "" | "y" | "Y" | "yes" => ApprovalResponse::approve(),
        other => ApprovalResponse::reject(other),
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    Ok(lines.next_line().await.context("Failed to read stdin")?)
}

/// 反复询问直到得到合法的审批结果
async fn approve_loop(
    supervisor: &Supervisor,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<Option<TurnOutcome>> {
    loop {
        let Some(answer) = read_line(lines).await? else {
            return Ok(None);
        };
        match supervisor.resume(THREAD_ID, parse_approval(&answer)).await {
            Ok(outcome) => return Ok(Some(outcome)),
            Err(OrchestratorError::InvalidApprovalOverride(t)) => {
                println!("无效的分类 '{}'，请输入 y 或以下分类之一：{}", t, hive::ClassificationType::choices());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        hive::config::AppConfig::default()
    });
    let supervisor = build_supervisor(cfg).await.context("Failed to build supervisor")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("输入问题开始对话（/web 网页搜索，@file:<路径> 附带文件，/quit 退出）");

    while let Some(line) = read_line(&mut lines).await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let (message, flags) = parse_input(line);
        let outcome = match supervisor.submit(THREAD_ID, message, flags).await {
            Ok(o) => o,
            Err(e) => {
                eprintln!("错误: {}", e);
                continue;
            }
        };

        let outcome = match outcome {
            TurnOutcome::Suspended(payload) => {
                println!("{}", payload.question);
                match approve_loop(&supervisor, &mut lines).await? {
                    Some(o) => o,
                    None => break,
                }
            }
            done => done,
        };

        if let TurnOutcome::Completed(report) = outcome {
            println!("[{}] {}", report.workflow, report.reply.unwrap_or_default());
            for d in &report.degradations {
                eprintln!("  降级: {:?}", d);
            }
        }
    }

    Ok(())
}
