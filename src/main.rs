use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use cert_quiz::models::language::{is_supported, language_name, native_name, supported_codes};
use cert_quiz::models::{AppSettings, QuizConfig};
use cert_quiz::utils::logging;
use cert_quiz::{
    BatchGenerator, CertificationValidator, Config, FileStore, LlmClient, NavigationEvent,
    ProgressStore, QuestionGenerator, SessionOrchestrator, SessionPhase, TextGenerator,
};

const CONFIG_FILE: &str = "quiz.toml";
const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

const USAGE: &str = "用法: cert_quiz [命令]

命令:
  quiz                 开始一次实时出题的测验（默认）
  bank <证书名称>      批量生成题目并加入证书题库
  replay <测验 id>     重做已保存的测验
  resume <会话 id>     继续未完成的会话
  export <测验 id>     以 JSON 输出测验
  import <文件>        导入测验 JSON
  validate <证书名称>  校验证书名称
  info                 查看已保存的测验与会话
  clear                清除全部数据";

/// 终端输入
struct Terminal {
    lines: Lines<BufReader<Stdin>>,
}

impl Terminal {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String> {
        print!("{}", label);
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => bail!("输入已结束"),
        }
    }

    async fn ask_or(&mut self, label: &str, default: &str) -> Result<String> {
        let answer = self.ask(&format!("{} [{}]: ", label, default)).await?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    logging::init(config.verbose_logging);
    logging::log_startup(&config.llm_model_name, &config.data_dir);

    let store = ProgressStore::new(Arc::new(FileStore::new(&config.data_dir)));
    let mut terminal = Terminal::new();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("quiz");
    let argument = args.get(1..).unwrap_or(&[]).join(" ");

    match command {
        "quiz" => run_quiz(&config, &store, &mut terminal).await,
        "bank" => run_bank(&config, &store, &mut terminal, required(&argument, "证书名称")?).await,
        "replay" => run_replay(&config, &store, &mut terminal, required(&argument, "测验 id")?).await,
        "resume" => run_resume(&config, &store, &mut terminal, required(&argument, "会话 id")?).await,
        "export" => {
            let json = store.export_quiz_json(required(&argument, "测验 id")?).await?;
            println!("{}", json);
            Ok(())
        }
        "import" => {
            let path = required(&argument, "文件")?;
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("读取 {} 失败", path))?;
            let quiz = store.import_quiz_json(&text).await?;
            println!("已导入: {} ({}，{} 题)", quiz.title, quiz.id, quiz.questions.len());
            Ok(())
        }
        "validate" => run_validate(&config, &store, &mut terminal, required(&argument, "证书名称")?).await,
        "info" => run_info(&store).await,
        "clear" => {
            store.clear_all().await?;
            println!("已清除全部数据");
            Ok(())
        }
        "help" | "-h" | "--help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("未知命令: {}\n\n{}", other, USAGE),
    }
}

/// 当前目录有 quiz.toml 时从文件加载，否则只读环境变量
fn load_config() -> Result<Config> {
    if Path::new(CONFIG_FILE).exists() {
        Ok(Config::from_toml_file(CONFIG_FILE)?)
    } else {
        Ok(Config::from_env())
    }
}

fn required<'a>(argument: &'a str, name: &str) -> Result<&'a str> {
    if argument.trim().is_empty() {
        bail!("缺少参数: {}\n\n{}", name, USAGE);
    }
    Ok(argument.trim())
}

/// API Key 依次取配置、已保存的设置、终端输入
async fn resolve_settings(
    config: &Config,
    store: &ProgressStore,
    terminal: &mut Terminal,
) -> Result<AppSettings> {
    let mut settings = store.load_settings().await?;
    if !config.llm_api_key.is_empty() {
        settings.api_key = config.llm_api_key.clone();
        return Ok(settings);
    }
    if settings.api_key.is_empty() {
        settings.api_key = terminal.ask("API Key: ").await?;
        if settings.api_key.is_empty() {
            bail!("缺少 API Key");
        }
        store.save_settings(&settings).await?;
    }
    Ok(settings)
}

fn backend_for(config: &Config, api_key: &str) -> Arc<dyn TextGenerator> {
    Arc::new(LlmClient::with_api_key(config, api_key))
}

fn question_generator(config: &Config, api_key: &str) -> QuestionGenerator {
    QuestionGenerator::new(backend_for(config, api_key)).with_policy(config.retry_policy())
}

async fn run_quiz(config: &Config, store: &ProgressStore, terminal: &mut Terminal) -> Result<()> {
    let settings = resolve_settings(config, store, terminal).await?;

    let certificate_name = terminal.ask("证书名称: ").await?;
    let count: usize = terminal
        .ask_or("题目数量 (1-20)", "5")
        .await?
        .parse()
        .context("题目数量必须是数字")?;
    let default_language = if settings.language.is_empty() {
        config.default_language.clone()
    } else {
        settings.language.clone()
    };
    let language = terminal.ask_or("语言代码", &default_language).await?;
    if !is_supported(&language) {
        bail!(
            "不支持的语言代码: {}（可选: {}）",
            language,
            supported_codes().join(", ")
        );
    }

    let certificate = store.find_or_create_certificate(&certificate_name).await?;
    let quiz_config = QuizConfig {
        api_key: settings.api_key.clone(),
        certificate_id: certificate.id,
        certificate_name,
        number_of_questions: count,
        language,
    };

    let orchestrator = SessionOrchestrator::new(
        quiz_config,
        question_generator(config, &settings.api_key),
        store.clone(),
    )?
    .with_stagger(config.background_stagger());

    drive(orchestrator, terminal).await
}

async fn run_bank(
    config: &Config,
    store: &ProgressStore,
    terminal: &mut Terminal,
    certificate_name: &str,
) -> Result<()> {
    let settings = resolve_settings(config, store, terminal).await?;
    let count: usize = terminal
        .ask_or("生成题目数量 (1-20)", "10")
        .await?
        .parse()
        .context("题目数量必须是数字")?;

    let certificate = store.find_or_create_certificate(certificate_name).await?;
    let quiz_config = QuizConfig {
        api_key: settings.api_key.clone(),
        certificate_id: certificate.id.clone(),
        certificate_name: certificate.name.clone(),
        number_of_questions: count,
        language: config.default_language.clone(),
    };
    quiz_config.validate()?;

    let generator = BatchGenerator::new(backend_for(config, &settings.api_key))
        .with_policy(config.batch_retry_policy())
        .with_batch_delay(config.batch_delay());

    let quiz = generator
        .generate_quiz(&quiz_config, |progress| {
            println!(
                "[{}/{}] {} ({}/{} 题)",
                progress.current_batch,
                progress.total_batches,
                progress.status,
                progress.completed,
                progress.total
            );
        })
        .await?;

    let set = store
        .create_or_update_question_set(&certificate.id, quiz.questions.clone())
        .await?;
    store.upsert_quiz(quiz.clone()).await?;

    println!(
        "已生成 {} 题，题库共 {} 题。测验 id: {}",
        quiz.questions.len(),
        set.questions.len(),
        quiz.id
    );
    Ok(())
}

async fn run_replay(
    config: &Config,
    store: &ProgressStore,
    terminal: &mut Terminal,
    quiz_id: &str,
) -> Result<()> {
    let quiz = match store.find_quiz(quiz_id).await? {
        Some(quiz) => quiz,
        None => bail!("找不到测验: {}", quiz_id),
    };

    let orchestrator = SessionOrchestrator::replay(&quiz, question_generator(config, ""), store.clone())?;
    drive(orchestrator, terminal).await
}

async fn run_resume(
    config: &Config,
    store: &ProgressStore,
    terminal: &mut Terminal,
    session_id: &str,
) -> Result<()> {
    let session = match store.load_session(session_id).await? {
        Some(session) => session,
        None => bail!("找不到会话: {}", session_id),
    };
    let api_key = if session.config.api_key.is_empty() {
        resolve_settings(config, store, terminal).await?.api_key
    } else {
        session.config.api_key.clone()
    };

    let orchestrator =
        SessionOrchestrator::resume(session, question_generator(config, &api_key), store.clone())?
            .with_stagger(config.background_stagger());
    drive(orchestrator, terminal).await
}

async fn run_validate(
    config: &Config,
    store: &ProgressStore,
    terminal: &mut Terminal,
    certificate_name: &str,
) -> Result<()> {
    let settings = resolve_settings(config, store, terminal).await?;
    let validator = CertificationValidator::new(backend_for(config, &settings.api_key));
    let result = validator.validate(certificate_name).await?;

    if result.is_valid {
        println!("✓ {} ({:?})", result.corrected_name, result.confidence);
        println!("  {}", result.description);
    } else {
        println!("✗ 未识别的证书: {}", certificate_name);
        for suggestion in &result.suggestions {
            println!("  - {}", suggestion);
        }
    }
    Ok(())
}

async fn run_info(store: &ProgressStore) -> Result<()> {
    let info = store.storage_info().await?;
    println!(
        "测验 {} 个，会话 {} 个，约 {}",
        info.quiz_count, info.session_count, info.estimated_size
    );

    for quiz in store.load_quizzes().await? {
        println!("  [测验] {}  {} ({} 题)", quiz.id, quiz.title, quiz.questions.len());
    }
    let mut sessions: Vec<_> = store.load_sessions().await?.into_values().collect();
    sessions.sort_by_key(|s| s.created_at);
    for session in sessions.iter().filter(|s| !s.completed) {
        println!(
            "  [未完成] {}  {} ({}/{} 题已答)",
            session.id,
            session.config.certificate_name,
            session.answers.len(),
            session.target_questions
        );
    }
    Ok(())
}

/// 终端答题循环
async fn drive(mut orchestrator: SessionOrchestrator, terminal: &mut Terminal) -> Result<()> {
    let language = &orchestrator.session().config.language;
    println!(
        "\n正在准备 {} 测验（{} / {}）...",
        orchestrator.session().config.certificate_name,
        language_name(language),
        native_name(language).unwrap_or_else(|| language_name(language)),
    );

    let mut started = orchestrator.start().await;
    while let Err(e) = started {
        println!("\n生成题目失败: {}", e);
        if !matches!(orchestrator.phase(), SessionPhase::Failed(_)) {
            return Err(e.into());
        }
        let choice = terminal.ask("r 重试 / q 退出: ").await?;
        if choice.eq_ignore_ascii_case("q") {
            orchestrator.exit().await;
            return Ok(());
        }
        started = orchestrator.retry().await;
    }

    while !orchestrator.is_completed() {
        let Some(question) = orchestrator.current_question().cloned() else {
            break;
        };
        let navigation = orchestrator.navigation();
        println!(
            "\n第 {}/{} 题  ({:.0}%)  得分 {}{}",
            navigation.current_index() + 1,
            navigation.target(),
            orchestrator.progress(),
            orchestrator.score(),
            if orchestrator.is_preparing_questions() {
                "  · 后台出题中"
            } else {
                ""
            }
        );
        println!("{}", question.question);
        for (label, option) in OPTION_LABELS.iter().zip(question.options.iter()) {
            println!("  {}. {}", label, option);
        }

        let selected = loop {
            let input = terminal.ask("答案 (A-D，q 退出): ").await?;
            if input.eq_ignore_ascii_case("q") {
                let session = orchestrator.exit().await;
                println!("已保存进度，会话 id: {}", session.id);
                return Ok(());
            }
            match parse_choice(&input) {
                Some(index) => break index,
                None => println!("请输入 A、B、C 或 D"),
            }
        };

        orchestrator.select_answer(selected);
        let Some(outcome) = orchestrator.submit_answer().await else {
            continue;
        };
        if outcome.record.is_correct {
            println!("✓ 回答正确");
        } else {
            println!(
                "✗ 回答错误，正确答案是 {}",
                OPTION_LABELS[question.correct_answer]
            );
        }
        println!("{}", question.explanation);

        let input = terminal.ask("回车继续，q 退出: ").await?;
        if input.eq_ignore_ascii_case("q") {
            let session = orchestrator.exit().await;
            println!("已保存进度，会话 id: {}", session.id);
            return Ok(());
        }

        if let Some(NavigationEvent::Completed(answers)) = orchestrator.advance().await {
            let correct = answers.iter().filter(|a| a.is_correct).count();
            println!(
                "\n🏆 测验完成: {}/{} ({}%)",
                correct,
                answers.len(),
                orchestrator.navigation().percentage()
            );
        }
    }
    Ok(())
}

/// 解析 A-D 或 1-4
fn parse_choice(input: &str) -> Option<usize> {
    let mut chars = input.trim().chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    match first.to_ascii_uppercase() {
        c @ 'A'..='D' => Some(c as usize - 'A' as usize),
        c @ '1'..='4' => Some(c as usize - '1' as usize),
        _ => None,
    }
}
