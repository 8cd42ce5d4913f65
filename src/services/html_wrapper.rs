//! API 响应到 HTML 的桥接 - 业务能力层
//!
//! logic 脚本只能在带 DOM 的页面里运行，API 返回的 JSON 因此被放进
//! 一个最小 HTML 文档的 `data-json` 属性中。
//! 只处理引号：去掉 `&#39;` 实体，再把单双引号互换。

/// 存放 JSON 的元素 id
pub const JSON_ELEMENT_ID: &str = "json-result";

/// 被移除的撇号实体
const APOSTROPHE_ENTITY: &str = "&#39;";

/// 去掉 `&#39;`，并互换单双引号
pub fn sanitize(json_text: &str) -> String {
    json_text
        .replace(APOSTROPHE_ENTITY, "")
        .chars()
        .map(swap_quote)
        .collect()
}

/// `sanitize` 的逆操作（`&#39;` 无法恢复）
pub fn restore(attribute_value: &str) -> String {
    attribute_value.chars().map(swap_quote).collect()
}

/// 把 JSON 文本包装成 HTML 文档
pub fn wrap(json_text: &str) -> String {
    let value = escape_attribute(&sanitize(json_text));
    format!(
        r#"<html>
<head>
<title>API</title>
</head>
<body>
<div id="{JSON_ELEMENT_ID}" data-json="{value}">UNRELATED</div>
</body>
</html>
"#
    )
}

fn swap_quote(c: char) -> char {
    match c {
        '"' => '\'',
        '\'' => '"',
        other => other,
    }
}

/// 互换之后原来的单引号变成了双引号，需要转义才能留在双引号属性里
fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
