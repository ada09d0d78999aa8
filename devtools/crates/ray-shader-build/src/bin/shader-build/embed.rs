//! 将编译产物转换为可以 `#include` 的 C 数组

use std::path::Path;

use anyhow::Context;

/// 每行输出的字节数
pub const BYTES_PER_LINE: usize = 64;

/// 生成的头文件相对二进制文件追加的扩展名
pub const HEADER_EXT: &str = "inl";

/// 把字节转换为 `0xAB, 0xCD, ...` 形式的文本
///
/// 每 [`BYTES_PER_LINE`] 个字节一行，行之间以 `,\n    ` 连接，最后一个字节后面没有逗号。
pub fn hex_literals(data: &[u8]) -> String {
    data.chunks(BYTES_PER_LINE)
        .map(|line| line.iter().map(|byte| format!("0x{byte:02X}")).collect::<Vec<_>>().join(", "))
        .collect::<Vec<_>>()
        .join(",\n    ")
}

/// 文件名中的 `/` 和 `.` 替换为 `_`
pub fn c_identifier(file_name: &str) -> String {
    file_name.replace(['/', '.'], "_")
}

/// 生成头文件内容
///
/// `file_name` 同时用于注释和变量名，分隔符统一为 `/`
pub fn bin2header(data: &[u8], file_name: &str) -> String {
    let file_name = file_name.replace('\\', "/");
    let ident = c_identifier(&file_name);
    let size = data.len();

    format!(
        "/* Contents of file {file_name} */\n\
         const long int {ident}_size = {size};\n\
         const unsigned char {ident}[{size}] = {{\n    {}\n}};\n",
        hex_literals(data)
    )
}

/// 读取 `root/rel_path`，在旁边写出 `<rel_path>.inl`，返回头文件路径
pub fn embed_file(root: &Path, rel_path: &Path) -> anyhow::Result<std::path::PathBuf> {
    let bin_path = root.join(rel_path);
    let data = std::fs::read(&bin_path).with_context(|| format!("failed to read {:?}", bin_path))?;

    let mut header_path = bin_path.into_os_string();
    header_path.push(".");
    header_path.push(HEADER_EXT);
    let header_path = std::path::PathBuf::from(header_path);

    let header = bin2header(&data, &rel_path.to_string_lossy());
    std::fs::write(&header_path, header).with_context(|| format!("failed to write {:?}", header_path))?;

    Ok(header_path)
}
