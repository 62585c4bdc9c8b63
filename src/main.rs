// ==========================================
// 商品导入系统 - 命令行入口
// ==========================================
// 命令: convert / export-knowledge / import-knowledge
// 知识库: --db 或环境变量 PRODUCT_IMPORT_DB_PATH,缺省为用户数据目录
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use product_import::db::{default_knowledge_db_path, KNOWLEDGE_DB_ENV};
use product_import::engine::{AmbiguityResolver, AutoDefaultResolver, InteractiveResolver};
use product_import::{
    logging, ConversionProfile, ConversionResult, KnowledgeStore, ProductImporter,
    ProductImporterImpl, SqliteKnowledgeRepository,
};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "product-import")]
#[command(version)]
#[command(about = "供应商商品文件 → 规范化商品记录")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 知识库 SQLite 文件
    #[arg(long, global = true, env = KNOWLEDGE_DB_ENV)]
    db: Option<PathBuf>,

    /// JSON 格式日志
    #[arg(long, global = true)]
    json_log: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// 汇总 + 行级错误
    Text,
    /// 完整转换结果
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// 转换一个或多个源文件
    Convert {
        /// 转换方案（JSON）
        #[arg(short, long)]
        profile: PathBuf,

        /// 源文件（csv/txt/tsv/xlsx/xls/xlsm/ods）
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 低置信度字段在终端逐项确认并学习
        #[arg(short, long)]
        interactive: bool,

        #[arg(short, long, default_value = "text", value_enum)]
        output: OutputFormat,
    },

    /// 导出知识库为 JSON
    ExportKnowledge {
        /// 输出文件（缺省写到标准输出）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 从 JSON 导入知识条目
    ImportKnowledge {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "执行失败");
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let db_path = cli
        .db
        .map(|p| p.display().to_string())
        .unwrap_or_else(default_knowledge_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", product_import::APP_NAME, product_import::VERSION);
    tracing::info!("知识库: {}", db_path);
    tracing::info!("==================================================");

    match cli.command {
        Commands::Convert {
            profile,
            files,
            interactive,
            output,
        } => convert(&db_path, profile, files, interactive, output).await,
        Commands::ExportKnowledge { file } => {
            let store = open_store(&db_path)?;
            let json = store.export_json()?;
            match file {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("写入 {} 失败", path.display()))?;
                    println!("已导出 {} 条知识到 {}", store.len()?, path.display());
                }
                None => println!("{}", json),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ImportKnowledge { file } => {
            let store = open_store(&db_path)?;
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("读取 {} 失败", file.display()))?;
            let count = store.import_json(&json)?;
            println!("已导入 {} 条知识", count);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn convert(
    db_path: &str,
    profile_path: PathBuf,
    files: Vec<PathBuf>,
    interactive: bool,
    output: OutputFormat,
) -> Result<ExitCode> {
    let profile = ConversionProfile::from_file(&profile_path)?;
    let store = Arc::new(open_store(db_path)?);

    let resolver: Arc<dyn AmbiguityResolver> = if interactive {
        Arc::new(InteractiveResolver::new(
            BufReader::new(std::io::stdin()),
            std::io::stderr(),
        ))
    } else {
        Arc::new(AutoDefaultResolver)
    };

    let importer = ProductImporterImpl::from_profile(profile, Some(store), Some(resolver))?;

    // Ctrl-C: 当前行结束后停止,输出部分结果
    let cancellation = importer.cancellation_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号,正在取消");
            cancellation.cancel();
        }
    });

    // 交互模式逐个文件处理,避免问答交错
    let results: Vec<Result<ConversionResult, String>> = if interactive {
        let mut results = Vec::with_capacity(files.len());
        for file in &files {
            results.push(
                importer
                    .import_file(file)
                    .await
                    .map_err(|e| format!("文件 {} 导入失败: {}", file.display(), e)),
            );
        }
        results
    } else {
        importer.batch_import(files.clone()).await
    };

    let mut failed = false;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(result) => print_result(file, &result, output)?,
            Err(message) => {
                failed = true;
                eprintln!("{}", message);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn open_store(db_path: &str) -> Result<KnowledgeStore> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建目录 {} 失败", parent.display()))?;
        }
    }

    // 强化步长与模糊距离由转换方案在编排器中设置
    let repo = SqliteKnowledgeRepository::new(db_path)?;
    Ok(KnowledgeStore::new(Arc::new(repo)))
}

fn print_result(file: &Path, result: &ConversionResult, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            println!("{}: {}", file.display(), result.summary());
            for error in &result.errors {
                println!(
                    "  行 {} [{}] {} | {}",
                    error.row, error.field, error.message, error.raw_line
                );
            }
            let review = result
                .valid_records
                .iter()
                .filter(|r| !r.remarks.is_empty())
                .count();
            if review > 0 {
                println!("  待复核记录: {}", review);
            }
        }
    }
    Ok(())
}
