//! Prompt templates with `{name}` placeholders.

use std::sync::LazyLock;

use crate::types::Passage;

static PLACEHOLDER_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{(\w+)\}").expect("placeholder regex is valid"));

#[derive(Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
}

impl PromptTemplate {
    /// Substitute placeholders in one pass. Values are inserted literally, so
    /// braces inside a user question are never expanded; unknown
    /// placeholders are left as written.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        PLACEHOLDER_RE
            .replace_all(self.text, |caps: &regex::Captures| {
                let key = &caps[1];
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn placeholders(&self) -> Vec<&'static str> {
        PLACEHOLDER_RE
            .captures_iter(self.text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }
}

pub static LAPTOP_PROMPT: PromptTemplate = PromptTemplate {
    name: "laptop",
    text: "Your job is to answer questions on laptops
Answer the question based only on the following context and be sure to include citations (ie: laptop1 or laptop2):
{context}

Question: {question}
",
};

pub static SMARTPHONE_PROMPT: PromptTemplate = PromptTemplate {
    name: "smartphone",
    text: "Your job is to answer questions on smartphones
Answer the question based only on the following context and be sure to include citations (ie: smartphone1 or smartphone2):
{context}

Question: {question}
",
};

pub static HEADPHONES_PROMPT: PromptTemplate = PromptTemplate {
    name: "headphones",
    text: "Your job is to answer questions on headphones
Answer the question based only on the following context and be sure to include citations (ie: headphones1 or headphones2):
{context}

Question: {question}
",
};

pub static SMARTWATCH_PROMPT: PromptTemplate = PromptTemplate {
    name: "smartwatch",
    text: "Your job is to answer questions on smartwatches
Answer the question based only on the following context and be sure to include citations (ie: smartwatch1 or smartwatch2):
{context}

Question: {question}
",
};

pub static HOME_THEATER_PROMPT: PromptTemplate = PromptTemplate {
    name: "home_theater",
    text: "Your job is to answer questions on the home theater package we sell
Answer the question based only on the following context and be sure to include citations (ie: hometheatersystem):
{context}

Question: {question}
",
};

pub static SMALL_TALK_PROMPT: PromptTemplate = PromptTemplate {
    name: "small_talk",
    text: "Your job is a friendly customer service bot. Respond to the user in a
friendly way and remind them we have lots of tech products like headphones, smartwatches, laptops, and more and ask how you can help.

Input: {input}
",
};

pub static STANDALONE_QUESTION_PROMPT: PromptTemplate = PromptTemplate {
    name: "standalone_question",
    text: "Given a chat history and the latest user question \
which might reference context in the chat history, \
formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.
Original Question: {question}
Chat History: {chat_history}",
};

/// System message for the message-based rewrite used by the conversational
/// pipeline; the history and the question follow as chat messages.
pub static CONTEXTUALIZE_SYSTEM_PROMPT: PromptTemplate = PromptTemplate {
    name: "contextualize",
    text: "Given a chat history and the latest user question \
which might reference context in the chat history, \
formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.",
};

pub static MULTI_QUERY_PROMPT: PromptTemplate = PromptTemplate {
    name: "multi_query",
    text: "You are an AI language model assistant. Your task is
to generate {count} different versions of the given user
question to retrieve relevant documents from a vector database.
By generating multiple perspectives on the user question,
your goal is to help the user overcome some of the limitations
of distance-based similarity search. Provide these alternative
questions separated by newlines. Original question: {question}",
};

pub static QA_SYSTEM_PROMPT: PromptTemplate = PromptTemplate {
    name: "qa",
    text: "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer \
the question. If you don't know the answer, say that you \
don't know. Use three sentences maximum and keep the \
answer concise.

{context}",
};

/// Render passages for the `{context}` slot, each headed by its source file
/// so the model can cite it.
pub fn format_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| match p.source() {
            Some(source) => format!("Source: {}\n{}", source, p.content),
            None => p.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
