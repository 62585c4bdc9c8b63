// ==========================================
// 商品导入系统 - 配置层
// ==========================================
// 职责: 文件布局、规则、字典、运行参数的加载与缺省值
// 来源: JSON 配置文件
// ==========================================

pub mod defaults;
pub mod file_configuration;
pub mod profile;
pub mod settings;

// 重导出核心配置类型
pub use file_configuration::FileConfiguration;
pub use profile::ConversionProfile;
pub use settings::ConversionSettings;
