error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Http(::reqwest::Error);
        Epub(::epub_builder::Error);
    }

    errors {
        Request(message: String, status: u16, reason: String, url: String) {
            description("request failed")
            display("{} [Status: {} because {}, url: {}]", message, status, reason, url)
        }
        UnsupportedSource(url: String) {
            description("unrecognized source")
            display("The content at {} doesn't match any pattern and is not recognized", url)
        }
        MissingElement(selector: String, url: String) {
            description("expected element not found")
            display("No element matching '{}' on {}", selector, url)
        }
        InvalidSelector(css: String, reason: String) {
            description("invalid css selector")
            display("Invalid selector '{}': {}", css, reason)
        }
        DuplicateImage(uid: String) {
            description("duplicate image id")
            display("An image with id '{}' is already part of the book", uid)
        }
        UnknownImageFormat(path: String) {
            description("unknown image format")
            display("Could not recognize the image format of {}", path)
        }
    }
}
