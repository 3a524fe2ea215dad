//! 终端命令解析
//!
//! 每行输入解析为一个 `Command`。序号参数从 1 开始，解析后转换为从 0 开始的下标。

use crate::error::CommandError;
use crate::models::order::OrderCategory;
use crate::models::specialty::Specialty;
use crate::services::board::BoardCategory;

pub const HELP: &str = r#"病例模拟:
  specialties                          列出可选专科
  start <专科名称|序号>                 生成新病例
  next                                 展示下一个阶段
  order <labs|imaging|management> <文本>  提交医嘱（文本中的 \n 表示换行）
  presets                              查看常用医嘱
  ddx add <诊断>                        添加鉴别诊断（放在最前）
  ddx rm <序号>                         删除鉴别诊断
  ddx mv <从> <到>                      调整鉴别诊断顺序
  ddx suggest <关键字>                  诊断自动补全
  reveal                               揭晓诊断并生成复盘
  close                                关闭复盘，回到首页
  status                               查看当前状态

教学白板:
  board add <differential|labs|diagnostics|management> <文本>
  board rm <类别> <序号>
  board mv <类别> <从> <到>
  board dx <最终诊断>
  board notes <笔记>
  board show
  board reset

  help                                 显示帮助
  quit                                 退出"#;

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Specialties,
    Start(Specialty),
    Next,
    Order(OrderCategory, String),
    Presets,
    DdxAdd(String),
    DdxRemove(usize),
    DdxMove(usize, usize),
    DdxSuggest(String),
    Reveal,
    Close,
    Status,
    BoardAdd(BoardCategory, String),
    BoardRemove(BoardCategory, usize),
    BoardMove(BoardCategory, usize, usize),
    BoardDx(String),
    BoardNotes(String),
    BoardShow,
    BoardReset,
    Help,
    Quit,
}

/// 取出第一个空白分隔的单词，返回 (单词, 剩余部分)
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

/// 解析从 1 开始的序号
fn parse_index(s: &str, usage: &'static str) -> Result<usize, CommandError> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn parse_specialty(arg: &str) -> Result<Specialty, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::Usage("start <专科名称|序号>"));
    }
    if let Ok(n) = arg.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| Specialty::ALL.get(i).copied())
            .ok_or_else(|| CommandError::UnknownSpecialty(arg.to_string()));
    }
    Specialty::find(arg).ok_or_else(|| CommandError::UnknownSpecialty(arg.to_string()))
}

/// 医嘱文本中的 `\n` 转换为换行
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn parse_ddx(rest: &str) -> Result<Command, CommandError> {
    let (sub, arg) = split_word(rest);
    match sub {
        "add" => Ok(Command::DdxAdd(arg.to_string())),
        "rm" => Ok(Command::DdxRemove(parse_index(arg, "ddx rm <序号>")?)),
        "mv" => {
            const USAGE: &str = "ddx mv <从> <到>";
            let (from, to) = split_word(arg);
            Ok(Command::DdxMove(
                parse_index(from, USAGE)?,
                parse_index(to, USAGE)?,
            ))
        }
        "suggest" => Ok(Command::DdxSuggest(arg.to_string())),
        _ => Err(CommandError::Usage("ddx <add|rm|mv|suggest> ...")),
    }
}

fn parse_board(rest: &str) -> Result<Command, CommandError> {
    let (sub, arg) = split_word(rest);
    match sub {
        "show" => return Ok(Command::BoardShow),
        "reset" => return Ok(Command::BoardReset),
        "dx" => return Ok(Command::BoardDx(arg.to_string())),
        "notes" => return Ok(Command::BoardNotes(arg.to_string())),
        _ => {}
    }

    let usage: &'static str = match sub {
        "add" => "board add <类别> <文本>",
        "rm" => "board rm <类别> <序号>",
        "mv" => "board mv <类别> <从> <到>",
        _ => return Err(CommandError::Usage("board <add|rm|mv|dx|notes|show|reset> ...")),
    };
    let (category, arg) = split_word(arg);
    let category = BoardCategory::from_str(category).ok_or(CommandError::Usage(usage))?;

    match sub {
        "add" => Ok(Command::BoardAdd(category, arg.to_string())),
        "rm" => Ok(Command::BoardRemove(category, parse_index(arg, usage)?)),
        _ => {
            let (from, to) = split_word(arg);
            Ok(Command::BoardMove(
                category,
                parse_index(from, usage)?,
                parse_index(to, usage)?,
            ))
        }
    }
}

/// 解析一行输入；空行返回 None
pub fn parse_command(line: &str) -> Option<Result<Command, CommandError>> {
    let (name, rest) = split_word(line.trim());
    if name.is_empty() {
        return None;
    }

    let command = match name.to_lowercase().as_str() {
        "specialties" | "ls" => Ok(Command::Specialties),
        "start" => parse_specialty(rest).map(Command::Start),
        "next" | "n" => Ok(Command::Next),
        "order" => {
            let (category, text) = split_word(rest);
            match OrderCategory::from_str(category) {
                Some(category) => Ok(Command::Order(category, unescape_newlines(text))),
                None => Err(CommandError::Usage("order <labs|imaging|management> <文本>")),
            }
        }
        "presets" => Ok(Command::Presets),
        "ddx" => parse_ddx(rest),
        "reveal" => Ok(Command::Reveal),
        "close" => Ok(Command::Close),
        "status" => Ok(Command::Status),
        "board" => parse_board(rest),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    };
    Some(command)
}
