pub const BLOCK_TEMPLATE: &str = "<div class=box><span>hello</span><img src=x><p>a &amp; b</div>";

pub fn make_blocks(blocks: usize) -> String {
    BLOCK_TEMPLATE.repeat(blocks)
}

/// A `<script>` body made of near-miss close tags.
pub fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri<pt");
    }
    body.push_str("</script>");
    body
}
