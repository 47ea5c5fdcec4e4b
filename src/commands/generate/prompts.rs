use super::*;

/// Prompt asking for `n` reformulations of a health query, optionally with
/// a persona, the topic narrative, and a chain-of-thought preamble.
pub fn query_variants(
    query: &str,
    role: bool,
    narrative: Option<&str>,
    chain_of_thought: u8,
    n: usize,
) -> String {
    let mut prompt = String::new();
    if role {
        prompt.push_str(
            "You are a search engineer trying to improve the relevance, correctness and \
             credibility of search results for health-related queries. ",
        );
    }

    prompt.push_str(&format!(
        "Given a query, you must provide a list of {n} alternative queries that express the \
         same information need as the original one, but that are phrased in such a way that \
         they are more likely to retrieve relevant, correct and credible documents.\n"
    ));
    prompt.push_str("Query\n");
    prompt.push_str(&format!("A person has typed [{query}] into a search engine.\n"));
    if let Some(narrative) = narrative {
        prompt.push_str(&format!("They were looking for: {narrative}\n"));
    }

    if chain_of_thought > 0 {
        prompt.push_str("Instructions\n");
        prompt.push_str("Let's think step by step:\n");
        prompt.push_str("Consider the underlying intent of the search.\n");
    }
    if chain_of_thought == 2 {
        prompt.push_str("Measure how prone the original query is to retrieve useful documents.\n");
        prompt.push_str(
            "Measure how prone the original query is to retrieve supportive documents for the \
             correct treatment of the query's question.\n",
        );
        prompt.push_str("Measure how prone the original query is to retrieve credible documents.\n");
        prompt.push_str(
            "Consider the aspects above and the relative importance of each, and produce ",
        );
    } else {
        prompt.push_str("Produce ");
    }

    prompt.push_str(
        "an array of variant queries without providing any reasoning. Example: \
         [\"query variant 1\", \"query variant 2\", ...]",
    );
    prompt
}

/// Appended when a variants reply failed to parse on a previous attempt.
pub const VARIANTS_FORMAT_REMINDER: &str =
    "\nUse a list format, as in the example: [\"query variant 1\", \"query variant 2\", ...]";

pub fn narrative(style: NarrativeStyle, query: &str) -> String {
    match style {
        NarrativeStyle::Examples => narrative_from_examples(query),
        NarrativeStyle::Style => narrative_from_style(query),
        NarrativeStyle::Basic => narrative_basic(query),
        NarrativeStyle::Trec => narrative_trec(query),
    }
}

fn narrative_from_examples(query: &str) -> String {
    let mut prompt = format!(
        "Given the query [{query}], write a narrative that describes its information need in \
         more detail and provides a specific explanation of what is considered to be \
         very-useful or useful information for the query.\n"
    );
    prompt.push_str(
        "For example, if the query is [Should I apply ice to a burn?], a good narrative could \
         be: 'Many people commonly put ice on burns in an attempt to stop the burning and \
         pain. A very useful document would discuss the effectiveness of using ice to treat \
         burns. A useful document would help a user decide if putting ice on burns is a \
         recommended treatment by providing information on recommended treatments for burns, \
         or may discuss benefits or concerns for application of ice to skin.'\n",
    );
    prompt.push_str(
        "Another example: if the query is [Does yoga improve the management of asthma?], a \
         good narrative could be: 'Asthma is a condition that causes shortness of breath or \
         chest pains due to narrowing airways. Yoga is an increasingly popular low-impact \
         exercise claiming relaxation, strength improvements and overall health benefits. A \
         very useful document would discuss the effectiveness of yoga in managing asthma \
         symptoms. A useful document would help a user make a decision about use of yoga to \
         help manage asthma.'\n",
    );
    prompt.push_str(
        "Write just the narrative using a similar format as in the examples above. Do not \
         include any other information and do not repeat the query in your answer.\n",
    );
    prompt
}

fn narrative_from_style(query: &str) -> String {
    let mut prompt = format!("Given the query [{query}], write a description that:\n");
    prompt.push_str("1. Identifies the key terms and concepts in the query.\n");
    prompt.push_str("2. Provides brief definitions or explanations for each term.\n");
    prompt.push_str("3. Rephrases the query to highlight its underlying concern or focus.\n");
    prompt.push_str("4. Adds relevant context to connect the terms meaningfully, if needed.\n");
    prompt.push_str(
        "5. Maintains an explanatory and neutral tone, ensuring clarity and conciseness.\n",
    );
    prompt.push_str(
        "Write just the description. Do not include any other information and do not repeat \
         the query in your answer.\n",
    );
    prompt
}

fn narrative_basic(query: &str) -> String {
    format!(
        "Given the query [{query}], write a narrative detailing the information need and \
         describing the characteristics of helpful and harmful documents. Write one paragraph \
         and do not repeat the query in your answer."
    )
}

fn narrative_trec(query: &str) -> String {
    format!(
        "Given the query [{query}], write a narrative detailing the information need and \
         describing the characteristics of helpful and harmful documents using the standard \
         TREC format for narratives. Write one paragraph and do not repeat the query in your \
         answer."
    )
}

/// Query-quality prediction prompt; the reply must be a JSON object with an
/// `H` score, plus `S` and `C` aspect scores at chain-of-thought level 2.
pub fn query_evaluation(
    query: &str,
    role: bool,
    narrative: Option<&str>,
    chain_of_thought: u8,
) -> String {
    let mut prompt = String::new();
    if role {
        prompt.push_str(
            "You are a query quality predictor evaluating the effectiveness of a user query \
             and the potential harmfulness of documents retrieved for that query. ",
        );
    }

    prompt.push_str(
        "Given a query, you must provide a score on an integer scale of 0 to 2 with the \
         following meanings:\n",
    );
    prompt.push_str(
        "2 = good query. The relevant documents that would appear as search results would \
         mainly provide information that is credible and correct\n",
    );
    prompt.push_str(
        "1 = average query. Some relevant documents that would appear as search results could \
         provide information that is correct but has low or moderate credibility\n",
    );
    prompt.push_str(
        "0 = bad query. Most relevant documents that would appear as search results could \
         provide incorrect information\n",
    );
    prompt.push_str("Query\n");
    prompt.push_str(&format!("A person has typed [{query}] into a search engine.\n"));
    if let Some(narrative) = narrative {
        prompt.push_str(&format!("They were looking for: {narrative}\n"));
    }

    if chain_of_thought > 0 {
        prompt.push_str("Instructions\n");
        prompt.push_str("Let's think step by step:\n");
        prompt.push_str("Consider the underlying intent of the search.\n");
    }
    if chain_of_thought == 2 {
        prompt.push_str(
            "Measure how prone the original query is to retrieve supportive documents for the \
             correct treatment of the query's question (S).\n",
        );
        prompt.push_str("Measure how prone the original query is to retrieve credible documents (C).\n");
        prompt.push_str(
            "Consider the aspects above and the relative importance of each, and decide",
        );
    } else {
        prompt.push_str("Decide");
    }
    prompt.push_str(" on the final score (H).\n");

    prompt.push_str("Produce a JSON score without providing any reasoning. Example: ");
    if chain_of_thought == 2 {
        prompt.push_str("{\"S\": 0, \"C\": 2, \"H\": 0}");
    } else {
        prompt.push_str("{\"H\": 1}");
    }
    prompt
}

pub fn controversy(query: &str, role: bool, judges: usize, factors: bool) -> String {
    let mut prompt = String::new();
    if role {
        prompt.push_str("You are an expert in information retrieval and search engine bias. ");
    }

    prompt.push_str(
        "Given a query, you must determine its level of controversy within the context of \
         health-related information retrieval.\n",
    );
    prompt.push_str(
        "Consider factors such as ambiguity, polarization in search results, potential \
         misinformation and conflicting information.\n",
    );

    if judges == 1 {
        prompt.push_str(&format!(
            "Think step by step and provide a score on an integer scale of 1 (not \
             controversial) to 5 (highly controversial) for the query [{query}].\n"
        ));
        if factors {
            prompt.push_str(
                "Your answer should be a JSON array of scores for the individual factors and \
                 the total score at the end. Do not include any textual description. Example: \
                 [1, 5, 2, 2, 3]\n",
            );
        } else {
            prompt.push_str(
                "Your answer should be a single integer representing the total score. Do not \
                 include any other information.",
            );
        }
    } else {
        prompt.push_str(&format!(
            "{judges} different controversy raters were asked to evaluate the query. Each \
             rater used their own independent judgement.\n"
        ));
        prompt.push_str(&format!(
            "Think step by step and provide {judges} scores on an integer scale of 1 (not \
             controversial) to 5 (highly controversial) for the query [{query}].\n"
        ));
        prompt.push_str(
            "Your answer should be a JSON array of scores without providing any reasoning. \
             Example: [1, 5, 2, 2, 3]",
        );
    }
    prompt
}

/// Passage-writing prompt; passages are separated by the `||PAS||` mark.
pub fn passages(query: &str) -> String {
    format!(
        "Write passages to answer the question [{query}]. Each passage should correspond to a \
         different interpretation, meaning or answer to the question. Write as many as \
         necessary to fully capture all possibilities.\nSeparate the passages with the mark \
         '||PAS||'. Do not include anything else in your answer."
    )
}
