//! 终端应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打印启动信息、按配置创建网关
//! 2. **命令循环**：逐行读取 stdin，解析为命令
//! 3. **调度**：病例命令交给 `CaseFlow`，白板命令交给 `BoardState`
//! 4. **展示**：把阶段、医嘱结果、复盘输出到终端
//!
//! 本模块不做业务判断，会话错误只展示给用户，不会终止程序。

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{build_gateway, AiGateway, AnyGateway};
use crate::models::order::OrderCategory;
use crate::models::part::{Part, Phase};
use crate::models::specialty::{suggest_diagnoses, Specialty};
use crate::models::transcript::TranscriptEntry;
use crate::orchestrator::command::{parse_command, Command, HELP};
use crate::services::board::{BoardCategory, BoardState};
use crate::utils::logging::log_startup;
use crate::utils::truncate_text;
use crate::workflow::case_flow::{CaseFlow, OrderOutcome};
use crate::workflow::case_state::Advance;

/// 命令执行后是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

/// 应用主结构
pub struct App {
    flow: CaseFlow<AnyGateway>,
    board: BoardState,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let gateway = build_gateway(&config)
            .await
            .context("创建 AI 网关失败")?;
        info!("✓ 网关已就绪: {}", gateway.name());

        Ok(Self {
            flow: CaseFlow::new(gateway, &config),
            board: BoardState::new(),
        })
    }

    /// 运行命令循环，直到 quit 或 stdin 结束
    pub async fn run(mut self) -> Result<()> {
        println!("{}", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"\n> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await.context("读取输入失败")? else {
                break;
            };

            let command = match parse_command(&line) {
                None => continue,
                Some(Ok(command)) => command,
                Some(Err(e)) => {
                    println!("⚠️ {}", AppError::from(e));
                    continue;
                }
            };

            if self.execute(command).await == Control::Quit {
                break;
            }
        }

        info!("👋 程序结束");
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Control {
        match command {
            Command::Quit => return Control::Quit,
            Command::Help => println!("{}", HELP),
            Command::Specialties => print_specialties(),
            Command::Presets => print_presets(),
            Command::Start(specialty) => self.start_case(specialty).await,
            Command::Next => self.advance(),
            Command::Order(category, text) => self.submit_order(category, &text).await,
            Command::Reveal => self.reveal().await,
            Command::Close => match self.flow.close_debrief() {
                Ok(()) => println!("已返回首页，输入 start <专科> 开始新病例"),
                Err(e) => println!("⚠️ {}", e),
            },
            Command::Status => self.print_status(),
            Command::DdxAdd(text) => {
                if self.flow.session_mut().add_differential(&text) {
                    self.print_differential();
                } else {
                    println!("⚠️ 鉴别诊断不能为空");
                }
            }
            Command::DdxRemove(index) => match self.flow.session_mut().remove_differential(index) {
                Ok(removed) => {
                    println!("已删除: {}", removed);
                    self.print_differential();
                }
                Err(e) => println!("⚠️ {}", e),
            },
            Command::DdxMove(from, to) => match self.flow.session_mut().move_differential(from, to) {
                Ok(()) => self.print_differential(),
                Err(e) => println!("⚠️ {}", e),
            },
            Command::DdxSuggest(query) => {
                let hits = suggest_diagnoses(&query);
                if hits.is_empty() {
                    println!("没有匹配的诊断");
                }
                for hit in hits {
                    println!("  - {}", hit);
                }
            }
            Command::BoardAdd(category, text) => {
                if self.board.add(category, &text).is_none() {
                    println!("⚠️ 内容不能为空 ({})", category.placeholder());
                }
                self.print_board_list(category);
            }
            Command::BoardRemove(category, index) => {
                match self.board.items(category).get(index).map(|item| item.id) {
                    Some(id) => {
                        self.board.remove(category, id);
                    }
                    None => println!("⚠️ 序号超出范围"),
                }
                self.print_board_list(category);
            }
            Command::BoardMove(category, from, to) => {
                let items = self.board.items(category);
                let ids = items
                    .get(from)
                    .zip(items.get(to))
                    .map(|(moved, target)| (moved.id, target.id));
                match ids {
                    Some((moved, target)) => {
                        self.board.reorder(category, moved, target);
                    }
                    None => println!("⚠️ 序号超出范围"),
                }
                self.print_board_list(category);
            }
            Command::BoardDx(text) => self.board.case_dx = text.trim().to_string(),
            Command::BoardNotes(text) => self.board.teaching_notes = text.trim().to_string(),
            Command::BoardShow => self.print_board(),
            Command::BoardReset => {
                self.board.reset();
                println!("白板已清空");
            }
        }
        Control::Continue
    }

    async fn start_case(&mut self, specialty: Specialty) {
        println!("⏳ 正在生成病例 [{}]...", specialty);
        let start = match self.flow.start_case(specialty).await {
            Ok(start) => start,
            Err(e) => {
                println!("⚠️ {}", e);
                return;
            }
        };

        if let Some(placeholder) = &start.error {
            error!("病例生成失败");
            println!("{}", placeholder);
            println!("可以重新输入 start <专科> 再试一次");
            return;
        }
        self.print_advance(start.advance);
    }

    fn advance(&mut self) {
        match self.flow.advance() {
            Ok(advance) => self.print_advance(advance),
            Err(e) => println!("⚠️ {}", e),
        }
    }

    fn print_advance(&self, advance: Advance) {
        match advance {
            Advance::Revealed { index, total } => {
                if let Some(TranscriptEntry::Phase(phase)) = self.flow.session().transcript().last() {
                    println!("\n── 阶段 {}/{} ──", index + 1, total);
                    print_phase(phase);
                }
                if self.flow.session().is_complete() {
                    println!("\n病例已全部展示，输入 reveal 揭晓诊断");
                }
            }
            Advance::AlreadyComplete => println!("病例已全部展示，输入 reveal 揭晓诊断"),
            Advance::NoPhases => println!("⚠️ 病例内容为空，请重新生成"),
        }
    }

    async fn submit_order(&mut self, category: OrderCategory, text: &str) {
        match self.flow.submit_order(category, text).await {
            Ok(OrderOutcome::Rejected) => println!("⚠️ 医嘱内容不能为空"),
            Ok(OrderOutcome::Cached(content)) => {
                println!("\n── {} 结果（已缓存）──\n{}", category, content)
            }
            Ok(OrderOutcome::Fetched(content)) => println!("\n── {} 结果 ──\n{}", category, content),
            Err(e) => println!("⚠️ {}", e),
        }
    }

    async fn reveal(&mut self) {
        println!("⏳ 正在生成病例复盘...");
        match self.flow.reveal_diagnosis().await {
            Ok(html) => {
                println!("\n══ 病例复盘 ══");
                println!("{}", html);
                println!("\n输入 close 返回首页");
            }
            Err(e) => println!("⚠️ {}", e),
        }
    }

    fn print_status(&self) {
        let session = self.flow.session();
        println!("阶段: {}", session.stage());
        if let Some(specialty) = session.specialty() {
            println!("专科: {}", specialty);
        }
        println!("进度: {}/{}", session.revealed(), session.total_phases());
        let orders = session.orders();
        println!(
            "已提交医嘱: 检查 {} / 影像 {} / 处置 {}",
            orders.labs.len(),
            orders.imaging.len(),
            orders.management.len()
        );
        self.print_differential();
    }

    fn print_differential(&self) {
        let differential = self.flow.session().differential();
        if differential.is_empty() {
            println!("鉴别诊断: （空）");
            return;
        }
        println!("鉴别诊断:");
        for (i, dx) in differential.iter().enumerate() {
            println!("  {}. {}", i + 1, dx);
        }
    }

    fn print_board_list(&self, category: BoardCategory) {
        println!("{}:", category.title());
        let items = self.board.items(category);
        if items.is_empty() {
            println!("  （空）");
        }
        for (i, item) in items.iter().enumerate() {
            println!("  {}. {}", i + 1, item.label);
        }
    }

    fn print_board(&self) {
        for category in BoardCategory::ALL {
            self.print_board_list(category);
        }
        println!("Leading Diagnosis: {}", self.board.leading_diagnosis());
        println!("Certainty: {}%", self.board.certainty_score());
        if !self.board.case_dx.is_empty() {
            println!("Case Dx: {}", self.board.case_dx);
        }
        if !self.board.teaching_notes.is_empty() {
            println!("Teaching Notes: {}", self.board.teaching_notes);
        }
    }
}

fn print_specialties() {
    for (i, specialty) in Specialty::ALL.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, specialty);
    }
}

fn print_presets() {
    for category in OrderCategory::ALL {
        println!("  {}: {}", category, category.presets().join(" | "));
    }
}

fn print_phase(phase: &Phase) {
    if phase.is_empty() {
        warn!("阶段内容为空");
    }
    for part in phase.parts() {
        match part {
            Part::Text { content } => println!("{}", content),
            Part::Image { data, .. } => {
                let uri = part.data_uri().unwrap_or_default();
                println!("[插图 {} ({} 字节)]", truncate_text(&uri, 40), data.len())
            }
        }
    }
}
