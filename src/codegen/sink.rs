/// Receives the generated assembly, one line at a time.
pub trait AsmSink {
    fn emit_line(&mut self, text: &str);
}

impl AsmSink for String {
    fn emit_line(&mut self, text: &str) {
        self.push_str(text);
        self.push('\n');
    }
}

impl AsmSink for Vec<String> {
    fn emit_line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}
