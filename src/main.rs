use anyhow::Result;
use ogc_filter_encoder::{EncoderConfig, FilterEncoder, OgcOptions};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "filter_encoder.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Ogc,
    Cql,
    Sld,
}

/// 交互会话状态
struct Session {
    encoder: FilterEncoder,
    format: OutputFormat,
    version: Option<String>,
    type_name: String,
}

/// 创建编码器实例，优先使用JSON配置，失败时使用默认配置
fn create_encoder_with_config() -> FilterEncoder {
    match EncoderConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载编码器配置: {}", CONFIG_FILE);
            println!("  默认版本: {}", config.default_version);
            println!("  空过滤器策略: {:?}", config.empty_filter);
            println!("  字段来源策略: {:?}", config.field_sources);
            FilterEncoder::with_config(config)
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            FilterEncoder::new()
        }
    }
}

fn print_help() {
    println!("输入一行JSON过滤描述进行编码，或使用以下命令:");
    println!("  :format ogc|cql|sld   切换输出格式");
    println!("  :version [v]          设置WFS版本（无参数时恢复默认）");
    println!("  :type <name>          设置要素类型名");
    println!("  :values <attribute>   生成GetPropertyValue请求");
    println!("  :help                 显示帮助");
    println!("  :quit                 退出");
}

impl Session {
    /// 处理一条命令，返回false表示退出
    fn command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (name, arg) {
            (":quit" | ":q", _) => return false,
            (":help", _) => print_help(),
            (":format", Some("ogc")) => self.format = OutputFormat::Ogc,
            (":format", Some("cql")) => self.format = OutputFormat::Cql,
            (":format", Some("sld")) => self.format = OutputFormat::Sld,
            (":format", _) => println!("❌ 未知格式，可选: ogc, cql, sld"),
            (":version", version) => {
                self.version = version.map(str::to_string);
                println!("版本: {}", self.version.as_deref().unwrap_or(&self.encoder.config().default_version));
            }
            (":type", Some(type_name)) => self.type_name = type_name.to_string(),
            (":values", Some(attribute)) => {
                println!("{}", self.encoder.get_ogc_all_property_value(&self.type_name, attribute))
            }
            _ => println!("❌ 未知命令: {}（输入 :help 查看帮助）", line),
        }
        true
    }

    fn encode(&self, json: &str) {
        let result = match self.format {
            OutputFormat::Ogc => {
                let options = OgcOptions {
                    version: self.version.clone(),
                    ..Default::default()
                };
                self.encoder.to_ogc_filter(&self.type_name, json, &options)
            }
            OutputFormat::Cql => self.encoder.to_cql_filter(json),
            OutputFormat::Sld => self.encoder.get_sld(&self.type_name, json, self.version.as_deref()),
        };
        match result {
            Ok(output) => println!("{}", output),
            Err(e) => println!("✗ 编码失败: {}", e),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("--- OGC Filter Encoder: 过滤描述到 OGC/CQL/SLD 编码器 ---");
    println!("\n[配置信息]:");
    let mut session = Session {
        encoder: create_encoder_with_config(),
        format: OutputFormat::Ogc,
        version: None,
        type_name: "topp:states".to_string(),
    };
    println!();
    print_help();

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                if line.starts_with(':') {
                    if !session.command(line) {
                        break;
                    }
                } else {
                    session.encode(line);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
